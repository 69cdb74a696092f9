// Sync facade: backend selection and the read model above it.
//
// The backend is chosen once, from configuration, at construction time.
// The local backend is read-through; the remote backend has no push
// channel, so the facade re-fetches a full snapshot of both collections
// after every mutating call (polling-on-write). Concurrent operators each
// see only their own latest fetch.

use async_trait::async_trait;
use tracing::info;

use crate::config::{BackendKind, Config};
use crate::model::{Player, Team};
use crate::scout::ScoutClient;
use crate::seed::SeedSource;
use crate::settlement::SettlementEngine;
use crate::store::{ApiStore, LocalStore, PlayerFilter, RecordStore, StoreError, WriteBatch};

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// The active storage backend, fixed for the facade's lifetime.
pub enum Backend {
    Local(LocalStore),
    Remote(ApiStore),
}

#[async_trait]
impl RecordStore for Backend {
    async fn player(&self, id: &str) -> Result<Option<Player>, StoreError> {
        match self {
            Backend::Local(store) => store.player(id).await,
            Backend::Remote(store) => store.player(id).await,
        }
    }

    async fn team(&self, id: &str) -> Result<Option<Team>, StoreError> {
        match self {
            Backend::Local(store) => store.team(id).await,
            Backend::Remote(store) => store.team(id).await,
        }
    }

    async fn players(&self, filter: &PlayerFilter) -> Result<Vec<Player>, StoreError> {
        match self {
            Backend::Local(store) => store.players(filter).await,
            Backend::Remote(store) => store.players(filter).await,
        }
    }

    async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        match self {
            Backend::Local(store) => store.teams().await,
            Backend::Remote(store) => store.teams().await,
        }
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        match self {
            Backend::Local(store) => store.apply(batch).await,
            Backend::Remote(store) => store.apply(batch).await,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncFacade
// ---------------------------------------------------------------------------

/// In-memory view of both collections, valid as of the last fetch.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
}

/// The operator-facing service: settlement operations plus reads, wired to
/// the configured backend. Owns its store handle; there is no ambient
/// singleton.
pub struct SyncFacade {
    engine: SettlementEngine<Backend>,
    scout: ScoutClient,
    backend_kind: BackendKind,
    snapshot: Snapshot,
}

impl SyncFacade {
    /// Build the facade from configuration. For the local backend this
    /// opens the database and loads seed data on first run (both
    /// collections empty); for the remote backend it fetches the initial
    /// snapshot.
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let seed = SeedSource::new(&config.seed.players_path, &config.seed.teams_path);
        let backend_kind = config.storage.backend;

        let backend = match backend_kind {
            BackendKind::Local => {
                info!("using local backend at {}", config.storage.db_path);
                Backend::Local(LocalStore::open(&config.storage.db_path)?)
            }
            BackendKind::Remote => {
                info!("using remote backend at {}", config.storage.api_base_url);
                Backend::Remote(ApiStore::new(&config.storage.api_base_url))
            }
        };

        let mut facade = SyncFacade {
            engine: SettlementEngine::new(backend, seed),
            scout: ScoutClient::from_config(config),
            backend_kind,
            snapshot: Snapshot::default(),
        };

        match backend_kind {
            BackendKind::Local => {
                crate::seed::seed_if_empty(facade.engine.store(), facade.engine.seed_source())
                    .await?;
            }
            BackendKind::Remote => facade.refresh().await?,
        }

        Ok(facade)
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    /// The settlement engine, for direct access in embedding code.
    pub fn engine(&self) -> &SettlementEngine<Backend> {
        &self.engine
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All players: read-through on the local backend, the latest snapshot
    /// on the remote backend.
    pub async fn players(&self) -> Result<Vec<Player>, StoreError> {
        match self.backend_kind {
            BackendKind::Local => self.engine.store().players(&PlayerFilter::all()).await,
            BackendKind::Remote => Ok(self.snapshot.players.clone()),
        }
    }

    /// All teams: read-through on the local backend, the latest snapshot
    /// on the remote backend.
    pub async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        match self.backend_kind {
            BackendKind::Local => self.engine.store().teams().await,
            BackendKind::Remote => Ok(self.snapshot.teams.clone()),
        }
    }

    /// Re-fetch both collections into the snapshot.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        self.snapshot.players = self.engine.store().players(&PlayerFilter::all()).await?;
        self.snapshot.teams = self.engine.store().teams().await?;
        Ok(())
    }

    /// Remote backend only: no push channel exists, so every mutation is
    /// followed by a full snapshot re-fetch.
    async fn refresh_after_mutation(&mut self) -> Result<(), StoreError> {
        match self.backend_kind {
            BackendKind::Local => Ok(()),
            BackendKind::Remote => self.refresh().await,
        }
    }

    // ------------------------------------------------------------------
    // Settlement operations
    // ------------------------------------------------------------------

    pub async fn sell(
        &mut self,
        player_id: &str,
        team_id: &str,
        bid: i64,
    ) -> Result<(), StoreError> {
        self.engine.sell(player_id, team_id, bid).await?;
        self.refresh_after_mutation().await
    }

    pub async fn unsell(&mut self, player_id: &str) -> Result<(), StoreError> {
        self.engine.unsell(player_id).await?;
        self.refresh_after_mutation().await
    }

    pub async fn add_player(&mut self, player: Player) -> Result<(), StoreError> {
        self.engine.add_player(player).await?;
        self.refresh_after_mutation().await
    }

    pub async fn update_player(&mut self, player: Player) -> Result<(), StoreError> {
        self.engine.update_player(player).await?;
        self.refresh_after_mutation().await
    }

    pub async fn delete_player(&mut self, player_id: &str) -> Result<(), StoreError> {
        self.engine.delete_player(player_id).await?;
        self.refresh_after_mutation().await
    }

    pub async fn delete_players(&mut self, player_ids: &[String]) -> Result<(), StoreError> {
        self.engine.delete_players(player_ids).await?;
        self.refresh_after_mutation().await
    }

    pub async fn delete_all_players(&mut self) -> Result<(), StoreError> {
        self.engine.delete_all_players().await?;
        self.refresh_after_mutation().await
    }

    pub async fn add_team(
        &mut self,
        name: &str,
        owner: &str,
        icon_player: &str,
        budget: i64,
    ) -> Result<Team, StoreError> {
        let team = self.engine.add_team(name, owner, icon_player, budget).await?;
        self.refresh_after_mutation().await?;
        Ok(team)
    }

    pub async fn update_team(&mut self, team: Team) -> Result<(), StoreError> {
        self.engine.update_team(team).await?;
        self.refresh_after_mutation().await
    }

    pub async fn delete_team(&mut self, team_id: &str) -> Result<(), StoreError> {
        self.engine.delete_team(team_id).await?;
        self.refresh_after_mutation().await
    }

    pub async fn delete_all_teams(&mut self) -> Result<(), StoreError> {
        self.engine.delete_all_teams().await?;
        self.refresh_after_mutation().await
    }

    pub async fn reset(&mut self) -> Result<(), StoreError> {
        self.engine.reset().await?;
        self.refresh_after_mutation().await
    }

    // ------------------------------------------------------------------
    // Scouting
    // ------------------------------------------------------------------

    /// AI scouting report for a player, or a fixed fallback string when the
    /// provider is unavailable.
    pub async fn scouting_report(&self, player: &Player) -> String {
        self.scout.scouting_report(player).await
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
