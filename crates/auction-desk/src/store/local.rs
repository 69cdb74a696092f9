// SQLite-backed local store: the development / embedded backend.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::model::{Player, Team};

use super::{Mutation, PlayerFilter, RecordStore, StoreError, WriteBatch};

/// Current on-disk schema version, recorded in the `schema_version` table
/// for future migrations.
const SCHEMA_VERSION: i64 = 1;

/// Embedded document store over SQLite. Each record is persisted as a JSON
/// document alongside its indexed columns; write batches run inside one
/// transaction so a failing step rolls the whole batch back.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open (or create) the store at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral in-memory store (useful for
    /// tests).
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS players (
                id      TEXT PRIMARY KEY,
                name    TEXT NOT NULL,
                role    TEXT NOT NULL,
                country TEXT NOT NULL,
                status  TEXT NOT NULL,
                team_id TEXT,
                doc     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_players_name    ON players(name);
            CREATE INDEX IF NOT EXISTS idx_players_role    ON players(role);
            CREATE INDEX IF NOT EXISTS idx_players_country ON players(country);
            CREATE INDEX IF NOT EXISTS idx_players_status  ON players(status);
            CREATE INDEX IF NOT EXISTS idx_players_team_id ON players(team_id);

            CREATE TABLE IF NOT EXISTS teams (
                id    TEXT PRIMARY KEY,
                name  TEXT NOT NULL,
                owner TEXT NOT NULL,
                doc   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_teams_name  ON teams(name);
            CREATE INDEX IF NOT EXISTS idx_teams_owner ON teams(owner);
            ",
        )?;

        let recorded: Option<i64> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        if recorded.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(LocalStore {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    /// The schema version recorded in the database.
    pub fn schema_version(&self) -> Result<i64, StoreError> {
        let conn = self.conn();
        let version =
            conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })?;
        Ok(version)
    }

    // ------------------------------------------------------------------
    // Synchronous internals
    // ------------------------------------------------------------------

    fn player_sync(&self, id: &str) -> Result<Option<Player>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT doc FROM players WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(doc) => Ok(Some(serde_json::from_str(&doc?)?)),
            None => Ok(None),
        }
    }

    fn team_sync(&self, id: &str) -> Result<Option<Team>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT doc FROM teams WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(doc) => Ok(Some(serde_json::from_str(&doc?)?)),
            None => Ok(None),
        }
    }

    fn players_sync(&self, filter: &PlayerFilter) -> Result<Vec<Player>, StoreError> {
        let conn = self.conn();

        // Insertion order (rowid) keeps listings deterministic; upserts keep
        // their original rowid.
        let docs: Vec<String> = match (&filter.team_id, filter.status) {
            (None, None) => {
                let mut stmt = conn.prepare("SELECT doc FROM players ORDER BY rowid")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (Some(team_id), None) => {
                let mut stmt = conn
                    .prepare("SELECT doc FROM players WHERE team_id = ?1 ORDER BY rowid")?;
                let rows = stmt.query_map(params![team_id], |row| row.get(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (None, Some(status)) => {
                let mut stmt = conn
                    .prepare("SELECT doc FROM players WHERE status = ?1 ORDER BY rowid")?;
                let rows = stmt.query_map(params![status.as_str()], |row| row.get(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (Some(team_id), Some(status)) => {
                let mut stmt = conn.prepare(
                    "SELECT doc FROM players WHERE team_id = ?1 AND status = ?2 ORDER BY rowid",
                )?;
                let rows =
                    stmt.query_map(params![team_id, status.as_str()], |row| row.get(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    fn teams_sync(&self) -> Result<Vec<Team>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT doc FROM teams ORDER BY rowid")?;
        let docs: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    fn apply_sync(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for mutation in batch.into_mutations() {
            match mutation {
                Mutation::InsertPlayer(player) | Mutation::PutPlayer(player) => {
                    let doc = serde_json::to_string(&player)?;
                    tx.execute(
                        "INSERT INTO players (id, name, role, country, status, team_id, doc)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                         ON CONFLICT(id) DO UPDATE SET
                            name    = excluded.name,
                            role    = excluded.role,
                            country = excluded.country,
                            status  = excluded.status,
                            team_id = excluded.team_id,
                            doc     = excluded.doc",
                        params![
                            player.id,
                            player.name,
                            player.role.as_str(),
                            player.country,
                            player.status.as_str(),
                            player.team_id,
                            doc,
                        ],
                    )?;
                }
                Mutation::InsertTeam(team) | Mutation::PutTeam(team) => {
                    let doc = serde_json::to_string(&team)?;
                    tx.execute(
                        "INSERT INTO teams (id, name, owner, doc)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(id) DO UPDATE SET
                            name  = excluded.name,
                            owner = excluded.owner,
                            doc   = excluded.doc",
                        params![team.id, team.name, team.owner, doc],
                    )?;
                }
                Mutation::DeletePlayer(id) => {
                    tx.execute("DELETE FROM players WHERE id = ?1", params![id])?;
                }
                Mutation::DeleteTeam(id) => {
                    tx.execute("DELETE FROM teams WHERE id = ?1", params![id])?;
                }
                Mutation::ClearPlayers => {
                    tx.execute("DELETE FROM players", [])?;
                }
                Mutation::ClearTeams => {
                    tx.execute("DELETE FROM teams", [])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn player(&self, id: &str) -> Result<Option<Player>, StoreError> {
        self.player_sync(id)
    }

    async fn team(&self, id: &str) -> Result<Option<Team>, StoreError> {
        self.team_sync(id)
    }

    async fn players(&self, filter: &PlayerFilter) -> Result<Vec<Player>, StoreError> {
        self.players_sync(filter)
    }

    async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        self.teams_sync()
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.apply_sync(batch)
    }
}
