// HTTP API for the players and teams resources.
//
// The production surface that remote clients (ApiStore) talk to. Both
// resources expose the same shape: GET lists the collection, POST inserts
// one record or an array, PUT merge-updates by id, DELETE removes one
// record (`?id=`) or the whole collection (`?all=true`).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::model::{next_entity_id, Player, Team};
use crate::store::{LocalStore, Mutation, PlayerFilter, RecordStore, StoreError, WriteBatch};

/// Build the API router over the given store.
pub fn router(store: Arc<LocalStore>) -> Router {
    Router::new()
        .route(
            "/api/players",
            get(list_players)
                .post(create_players)
                .put(update_player)
                .delete(delete_players),
        )
        .route(
            "/api/teams",
            get(list_teams)
                .post(create_teams)
                .put(update_team)
                .delete(delete_teams),
        )
        .with_state(store)
}

/// Serve the API on an already-bound listener until the task is cancelled.
pub async fn serve(
    listener: tokio::net::TcpListener,
    store: Arc<LocalStore>,
) -> std::io::Result<()> {
    info!("API server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(store)).await
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

enum ApiError {
    /// Client mistake: missing id, unparseable record.
    BadRequest(String),
    /// Anything else; logged, reported as the 500 envelope.
    Internal(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(err) => {
                error!("API handler error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DeleteParams {
    id: Option<String>,
    all: Option<String>,
}

/// Ensure an incoming record carries a non-empty id, generating one with
/// the given prefix when absent.
fn ensure_id(value: &mut Value, prefix: &str) {
    let needs_id = value
        .get("id")
        .and_then(|v| v.as_str())
        .map_or(true, |s| s.is_empty());
    if needs_id {
        if let Value::Object(map) = value {
            map.insert("id".to_string(), Value::String(next_entity_id(prefix)));
        }
    }
}

/// Merge `updates` into `existing`: present keys overwrite, explicit nulls
/// remove the key (how clients clear optional fields like soldPrice).
fn merge_doc(mut existing: Map<String, Value>, updates: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in updates {
        if value.is_null() {
            existing.remove(&key);
        } else {
            existing.insert(key, value);
        }
    }
    existing
}

fn body_as_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest("expected a JSON object".to_string())),
    }
}

fn required_id(map: &Map<String, Value>, message: &str) -> Result<String, ApiError> {
    match map.get("id").and_then(|v| v.as_str()) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

// ---------------------------------------------------------------------------
// /api/players
// ---------------------------------------------------------------------------

async fn list_players(
    State(store): State<Arc<LocalStore>>,
) -> Result<Json<Vec<Player>>, ApiError> {
    Ok(Json(store.players(&PlayerFilter::all()).await?))
}

async fn create_players(
    State(store): State<Arc<LocalStore>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    match body {
        Value::Array(items) => {
            if items.is_empty() {
                return Ok(
                    (StatusCode::OK, Json(json!({ "message": "No data to insert" })))
                        .into_response(),
                );
            }

            let mut batch = WriteBatch::new();
            let mut ids = Vec::with_capacity(items.len());
            for mut item in items {
                ensure_id(&mut item, "p");
                let player: Player = serde_json::from_value(item)
                    .map_err(|e| ApiError::BadRequest(format!("invalid player record: {e}")))?;
                ids.push(player.id.clone());
                batch.push(Mutation::InsertPlayer(player));
            }
            let count = ids.len();
            store.apply(batch).await?;

            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": format!("Inserted {count} players"), "ids": ids })),
            )
                .into_response())
        }
        mut single => {
            ensure_id(&mut single, "p");
            let player: Player = serde_json::from_value(single)
                .map_err(|e| ApiError::BadRequest(format!("invalid player record: {e}")))?;
            store
                .apply(WriteBatch::from(vec![Mutation::InsertPlayer(player.clone())]))
                .await?;
            Ok((StatusCode::CREATED, Json(player)).into_response())
        }
    }
}

async fn update_player(
    State(store): State<Arc<LocalStore>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let updates = body_as_object(body)?;
    let id = required_id(&updates, "ID is required for update")?;

    // Unknown id is a no-op, not an error: the update simply matches
    // nothing, exactly like the source system.
    if let Some(existing) = store.player(&id).await? {
        let existing_doc = match serde_json::to_value(&existing).map_err(StoreError::from)? {
            Value::Object(map) => map,
            _ => unreachable!("records serialize as objects"),
        };
        let merged = merge_doc(existing_doc, updates);
        let player: Player = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ApiError::BadRequest(format!("invalid player update: {e}")))?;
        store
            .apply(WriteBatch::from(vec![Mutation::PutPlayer(player)]))
            .await?;
    }

    Ok((StatusCode::OK, Json(json!({ "message": "Player updated" }))).into_response())
}

async fn delete_players(
    State(store): State<Arc<LocalStore>>,
    Query(params): Query<DeleteParams>,
) -> Result<Response, ApiError> {
    if let Some(id) = params.id.filter(|id| !id.is_empty()) {
        store
            .apply(WriteBatch::from(vec![Mutation::DeletePlayer(id)]))
            .await?;
        Ok((StatusCode::OK, Json(json!({ "message": "Player deleted" }))).into_response())
    } else if params.all.as_deref() == Some("true") {
        store
            .apply(WriteBatch::from(vec![Mutation::ClearPlayers]))
            .await?;
        Ok((
            StatusCode::OK,
            Json(json!({ "message": "All players deleted" })),
        )
            .into_response())
    } else {
        Err(ApiError::BadRequest("ID is required for deletion".to_string()))
    }
}

// ---------------------------------------------------------------------------
// /api/teams
// ---------------------------------------------------------------------------

async fn list_teams(State(store): State<Arc<LocalStore>>) -> Result<Json<Vec<Team>>, ApiError> {
    Ok(Json(store.teams().await?))
}

async fn create_teams(
    State(store): State<Arc<LocalStore>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    match body {
        Value::Array(items) => {
            if items.is_empty() {
                return Ok(
                    (StatusCode::OK, Json(json!({ "message": "No data to insert" })))
                        .into_response(),
                );
            }

            let mut batch = WriteBatch::new();
            let mut ids = Vec::with_capacity(items.len());
            for mut item in items {
                ensure_id(&mut item, "t");
                let team: Team = serde_json::from_value(item)
                    .map_err(|e| ApiError::BadRequest(format!("invalid team record: {e}")))?;
                ids.push(team.id.clone());
                batch.push(Mutation::InsertTeam(team));
            }
            let count = ids.len();
            store.apply(batch).await?;

            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": format!("Inserted {count} teams"), "ids": ids })),
            )
                .into_response())
        }
        mut single => {
            ensure_id(&mut single, "t");
            let team: Team = serde_json::from_value(single)
                .map_err(|e| ApiError::BadRequest(format!("invalid team record: {e}")))?;
            store
                .apply(WriteBatch::from(vec![Mutation::InsertTeam(team.clone())]))
                .await?;
            Ok((StatusCode::CREATED, Json(team)).into_response())
        }
    }
}

async fn update_team(
    State(store): State<Arc<LocalStore>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let updates = body_as_object(body)?;
    let id = required_id(&updates, "ID is required for update")?;

    if let Some(existing) = store.team(&id).await? {
        let existing_doc = match serde_json::to_value(&existing).map_err(StoreError::from)? {
            Value::Object(map) => map,
            _ => unreachable!("records serialize as objects"),
        };
        let merged = merge_doc(existing_doc, updates);
        let team: Team = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ApiError::BadRequest(format!("invalid team update: {e}")))?;
        store
            .apply(WriteBatch::from(vec![Mutation::PutTeam(team)]))
            .await?;
    }

    Ok((StatusCode::OK, Json(json!({ "message": "Team updated" }))).into_response())
}

async fn delete_teams(
    State(store): State<Arc<LocalStore>>,
    Query(params): Query<DeleteParams>,
) -> Result<Response, ApiError> {
    if let Some(id) = params.id.filter(|id| !id.is_empty()) {
        store
            .apply(WriteBatch::from(vec![Mutation::DeleteTeam(id)]))
            .await?;
        Ok((StatusCode::OK, Json(json!({ "message": "Team deleted" }))).into_response())
    } else if params.all.as_deref() == Some("true") {
        store
            .apply(WriteBatch::from(vec![Mutation::ClearTeams]))
            .await?;
        Ok((
            StatusCode::OK,
            Json(json!({ "message": "All teams deleted" })),
        )
            .into_response())
    } else {
        Err(ApiError::BadRequest("ID is required for deletion".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
