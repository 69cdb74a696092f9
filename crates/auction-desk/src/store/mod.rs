// Record store abstraction over the two auction collections.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Player, PlayerStatus, Team};

pub use local::LocalStore;
pub use remote::ApiStore;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} record not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage backend error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode a stored record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("remote API unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("remote API returned status {status}")]
    RemoteStatus { status: u16 },
}

impl StoreError {
    pub(crate) fn player_not_found(id: &str) -> Self {
        StoreError::NotFound {
            collection: "player",
            id: id.to_string(),
        }
    }

    pub(crate) fn team_not_found(id: &str) -> Self {
        StoreError::NotFound {
            collection: "team",
            id: id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Write batches
// ---------------------------------------------------------------------------

/// A single write against one of the two collections.
///
/// `Insert*` creates a record that is not expected to exist yet; `Put*`
/// upserts. The local backend treats both identically, but the remote
/// backend must distinguish them because its API creates via POST and
/// updates via PUT.
#[derive(Debug, Clone)]
pub enum Mutation {
    InsertPlayer(Player),
    InsertTeam(Team),
    PutPlayer(Player),
    PutTeam(Team),
    DeletePlayer(String),
    DeleteTeam(String),
    ClearPlayers,
    ClearTeams,
}

/// An ordered sequence of writes applied as one unit.
///
/// This is the store's transaction primitive: the local backend applies the
/// whole batch inside a single SQLite transaction (any failure rolls the
/// entire batch back), the remote backend replays it as sequential HTTP
/// calls with no cross-call atomicity.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

impl From<Vec<Mutation>> for WriteBatch {
    fn from(mutations: Vec<Mutation>) -> Self {
        WriteBatch { mutations }
    }
}

// ---------------------------------------------------------------------------
// Read filters
// ---------------------------------------------------------------------------

/// Filter for player listings. Empty filter matches every player.
#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub team_id: Option<String>,
    pub status: Option<PlayerStatus>,
}

impl PlayerFilter {
    pub fn all() -> Self {
        PlayerFilter::default()
    }

    pub fn by_team(team_id: &str) -> Self {
        PlayerFilter {
            team_id: Some(team_id.to_string()),
            status: None,
        }
    }

    pub fn by_status(status: PlayerStatus) -> Self {
        PlayerFilter {
            team_id: None,
            status: Some(status),
        }
    }

    /// Whether the given player passes this filter.
    pub fn matches(&self, player: &Player) -> bool {
        if let Some(team_id) = &self.team_id {
            if player.team_id.as_deref() != Some(team_id.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if player.status != status {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// RecordStore trait
// ---------------------------------------------------------------------------

/// Keyed storage for the player and team collections.
///
/// The settlement engine is written against this trait and must not know
/// which backend it is talking to.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a single player by id.
    async fn player(&self, id: &str) -> Result<Option<Player>, StoreError>;

    /// Fetch a single team by id.
    async fn team(&self, id: &str) -> Result<Option<Team>, StoreError>;

    /// List players matching `filter`.
    async fn players(&self, filter: &PlayerFilter) -> Result<Vec<Player>, StoreError>;

    /// List all teams.
    async fn teams(&self) -> Result<Vec<Team>, StoreError>;

    /// Apply a write batch. See [`WriteBatch`] for the atomicity contract.
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
