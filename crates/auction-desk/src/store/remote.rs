// HTTP API client store: the production / remote backend.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::model::{Player, Team};

use super::{Mutation, PlayerFilter, RecordStore, StoreError, WriteBatch};

/// Remote store speaking the `/api/{players,teams}` surface.
///
/// The API exposes whole-collection reads only, so single-record reads
/// list and find. Write batches are replayed as sequential HTTP calls:
/// there is NO cross-call atomicity, and a failure mid-batch leaves the
/// earlier calls applied. Consecutive inserts are grouped into the API's
/// bulk POST form.
pub struct ApiStore {
    http: reqwest::Client,
    base_url: String,
}

impl ApiStore {
    /// Create a client for the API rooted at `base_url`
    /// (e.g. `http://127.0.0.1:8990`).
    pub fn new(base_url: &str) -> Self {
        ApiStore {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resource_url(&self, resource: &str) -> String {
        format!("{}/api/{resource}", self.base_url)
    }

    async fn fetch_all<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, StoreError> {
        let response = self.http.get(self.resource_url(resource)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::RemoteStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<(), StoreError> {
        let response = self
            .http
            .post(self.resource_url(resource))
            .json(body)
            .send()
            .await?;
        self.check(response)
    }

    async fn put<B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<(), StoreError> {
        let response = self
            .http
            .put(self.resource_url(resource))
            .json(body)
            .send()
            .await?;
        self.check(response)
    }

    async fn delete_one(&self, resource: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.resource_url(resource))
            .query(&[("id", id)])
            .send()
            .await?;
        self.check(response)
    }

    async fn delete_all(&self, resource: &str) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.resource_url(resource))
            .query(&[("all", "true")])
            .send()
            .await?;
        self.check(response)
    }

    fn check(&self, response: reqwest::Response) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::RemoteStatus {
                status: status.as_u16(),
            })
        }
    }

    /// POST buffered inserts, using the bulk array form when more than one
    /// record is pending.
    async fn flush_inserts(
        &self,
        players: &mut Vec<Player>,
        teams: &mut Vec<Team>,
    ) -> Result<(), StoreError> {
        if !players.is_empty() {
            debug!(count = players.len(), "posting buffered player inserts");
            if players.len() == 1 {
                self.post("players", &players[0]).await?;
            } else {
                self.post("players", &players[..]).await?;
            }
            players.clear();
        }
        if !teams.is_empty() {
            debug!(count = teams.len(), "posting buffered team inserts");
            if teams.len() == 1 {
                self.post("teams", &teams[0]).await?;
            } else {
                self.post("teams", &teams[..]).await?;
            }
            teams.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for ApiStore {
    async fn player(&self, id: &str) -> Result<Option<Player>, StoreError> {
        let all: Vec<Player> = self.fetch_all("players").await?;
        Ok(all.into_iter().find(|p| p.id == id))
    }

    async fn team(&self, id: &str) -> Result<Option<Team>, StoreError> {
        let all: Vec<Team> = self.fetch_all("teams").await?;
        Ok(all.into_iter().find(|t| t.id == id))
    }

    async fn players(&self, filter: &PlayerFilter) -> Result<Vec<Player>, StoreError> {
        // The API has no filter parameters; filtering happens client-side.
        let all: Vec<Player> = self.fetch_all("players").await?;
        Ok(all.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        self.fetch_all("teams").await
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut insert_players: Vec<Player> = Vec::new();
        let mut insert_teams: Vec<Team> = Vec::new();

        for mutation in batch.into_mutations() {
            match mutation {
                Mutation::InsertPlayer(player) => insert_players.push(player),
                Mutation::InsertTeam(team) => insert_teams.push(team),
                other => {
                    self.flush_inserts(&mut insert_players, &mut insert_teams)
                        .await?;
                    match other {
                        Mutation::PutPlayer(player) => {
                            self.put("players", &player_put_doc(&player)?).await?
                        }
                        Mutation::PutTeam(team) => {
                            self.put("teams", &team_put_doc(&team)?).await?
                        }
                        Mutation::DeletePlayer(id) => self.delete_one("players", &id).await?,
                        Mutation::DeleteTeam(id) => self.delete_one("teams", &id).await?,
                        Mutation::ClearPlayers => self.delete_all("players").await?,
                        Mutation::ClearTeams => self.delete_all("teams").await?,
                        Mutation::InsertPlayer(_) | Mutation::InsertTeam(_) => unreachable!(),
                    }
                }
            }
        }

        self.flush_inserts(&mut insert_players, &mut insert_teams)
            .await
    }
}

/// Serialize a player for the merge-updating PUT endpoint. Optional fields
/// the settlement engine can clear must travel as explicit nulls, otherwise
/// the server-side merge would keep their previous values.
fn player_put_doc(player: &Player) -> Result<Value, StoreError> {
    let mut doc = serde_json::to_value(player)?;
    if let Value::Object(map) = &mut doc {
        for key in ["soldPrice", "teamId"] {
            map.entry(key).or_insert(Value::Null);
        }
    }
    Ok(doc)
}

/// Team counterpart of [`player_put_doc`].
fn team_put_doc(team: &Team) -> Result<Value, StoreError> {
    let mut doc = serde_json::to_value(team)?;
    if let Value::Object(map) = &mut doc {
        map.entry("iconPlayer").or_insert(Value::Null);
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayerRole;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn put_doc_sends_cleared_optionals_as_null() {
        let player = Player::new("A", PlayerRole::Batsman, "India", 10);
        let doc = player_put_doc(&player).unwrap();
        assert!(doc["soldPrice"].is_null());
        assert!(doc["teamId"].is_null());

        let mut sold = Player::new("B", PlayerRole::Bowler, "India", 10);
        sold.sold_price = Some(250);
        sold.team_id = Some("t1".to_string());
        let doc = player_put_doc(&sold).unwrap();
        assert_eq!(doc["soldPrice"], 250);
        assert_eq!(doc["teamId"], "t1");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let store = ApiStore::new("http://localhost:9000/");
        assert_eq!(
            store.resource_url("players"),
            "http://localhost:9000/api/players"
        );
    }

    /// Helper: one-shot HTTP server that answers a single request with the
    /// given status line and JSON body.
    async fn one_shot_server(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn players_parses_listing() {
        let player = Player::new("Virat Kohli", PlayerRole::Batsman, "India", 200);
        let body = serde_json::to_string(&vec![player.clone()]).unwrap();
        let base = one_shot_server("HTTP/1.1 200 OK", body).await;

        let store = ApiStore::new(&base);
        let players = store.players(&PlayerFilter::all()).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Virat Kohli");
    }

    #[tokio::test]
    async fn player_lookup_finds_by_id() {
        let mut a = Player::new("A", PlayerRole::Batsman, "India", 10);
        a.id = "p1".to_string();
        let mut b = Player::new("B", PlayerRole::Bowler, "India", 10);
        b.id = "p2".to_string();
        let body = serde_json::to_string(&vec![a, b]).unwrap();
        let base = one_shot_server("HTTP/1.1 200 OK", body).await;

        let store = ApiStore::new(&base);
        let found = store.player("p2").await.unwrap();
        assert_eq!(found.unwrap().name, "B");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_remote_status() {
        let base = one_shot_server(
            "HTTP/1.1 500 Internal Server Error",
            r#"{"error":"Internal Server Error"}"#.to_string(),
        )
        .await;

        let store = ApiStore::new(&base);
        let err = store.teams().await.unwrap_err();
        match err {
            StoreError::RemoteStatus { status } => assert_eq!(status, 500),
            other => panic!("expected RemoteStatus, got: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_network_error() {
        // Bind then drop a listener to find a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = ApiStore::new(&format!("http://{addr}"));
        let err = store.teams().await.unwrap_err();
        assert!(matches!(err, StoreError::Network(_)), "got: {err}");
    }
}
