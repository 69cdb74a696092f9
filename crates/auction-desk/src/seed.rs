// Seed data: externally supplied JSON rosters with a built-in fallback.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::model::{Player, PlayerRole, PlayerStats, PlayerStatus, Team};
use crate::store::{Mutation, PlayerFilter, RecordStore, StoreError, WriteBatch};

/// Default budget for the built-in teams.
pub const INITIAL_BUDGET: i64 = 1000;

/// The initial/default player and team records loaded on first run or reset.
#[derive(Debug, Clone)]
pub struct SeedData {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
}

/// Locates and loads seed data. A missing or malformed file degrades to the
/// built-in default roster, per collection independently; loading never
/// fails.
#[derive(Debug, Clone)]
pub struct SeedSource {
    players_path: PathBuf,
    teams_path: PathBuf,
}

impl SeedSource {
    pub fn new(players_path: impl Into<PathBuf>, teams_path: impl Into<PathBuf>) -> Self {
        SeedSource {
            players_path: players_path.into(),
            teams_path: teams_path.into(),
        }
    }

    /// Load both collections, falling back to the built-in defaults for
    /// whichever file is absent or unreadable.
    pub fn load(&self) -> SeedData {
        let players = match load_json::<Player>(&self.players_path) {
            Some(players) => players,
            None => {
                warn!(
                    path = %self.players_path.display(),
                    "seed players unavailable, using built-in defaults"
                );
                default_players()
            }
        };

        let teams = match load_json::<Team>(&self.teams_path) {
            Some(teams) => teams,
            None => {
                warn!(
                    path = %self.teams_path.display(),
                    "seed teams unavailable, using built-in defaults"
                );
                default_teams()
            }
        };

        SeedData { players, teams }
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<Vec<T>> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Load seed data into `store` when both collections are empty (first
/// run). Returns whether seeding happened.
pub async fn seed_if_empty<S: RecordStore>(
    store: &S,
    source: &SeedSource,
) -> Result<bool, StoreError> {
    if !store.players(&PlayerFilter::all()).await?.is_empty()
        || !store.teams().await?.is_empty()
    {
        return Ok(false);
    }

    info!("empty database, loading seed data");
    let seed = source.load();
    let mut batch = WriteBatch::new();
    for player in seed.players {
        batch.push(Mutation::InsertPlayer(player));
    }
    for team in seed.teams {
        batch.push(Mutation::InsertTeam(team));
    }
    store.apply(batch).await?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Built-in defaults
// ---------------------------------------------------------------------------

/// The bundled default player pool.
pub fn default_players() -> Vec<Player> {
    vec![
        Player {
            id: "p1".to_string(),
            name: "Virat Kohli".to_string(),
            role: PlayerRole::Batsman,
            country: "India".to_string(),
            base_price: 200,
            stats: PlayerStats {
                matches: 234,
                runs: Some(7263),
                wickets: Some(4),
                ..PlayerStats::default()
            },
            status: PlayerStatus::Available,
            sold_price: None,
            team_id: None,
            image: Some("https://picsum.photos/seed/virat/400/400".to_string()),
            batting_style: Some("Right-handed".to_string()),
            bowling_style: Some("Right-arm medium".to_string()),
            is_wicket_keeper: Some(false),
            available_dates: Some("Full Season".to_string()),
        },
        Player {
            id: "p2".to_string(),
            name: "Jasprit Bumrah".to_string(),
            role: PlayerRole::Bowler,
            country: "India".to_string(),
            base_price: 200,
            stats: PlayerStats {
                matches: 120,
                runs: Some(120),
                wickets: Some(145),
                ..PlayerStats::default()
            },
            status: PlayerStatus::Available,
            sold_price: None,
            team_id: None,
            image: Some("https://picsum.photos/seed/bumrah/400/400".to_string()),
            batting_style: Some("Right-handed".to_string()),
            bowling_style: Some("Right-arm fast".to_string()),
            is_wicket_keeper: Some(false),
            available_dates: Some("Full Season".to_string()),
        },
    ]
}

/// The bundled default franchises.
pub fn default_teams() -> Vec<Team> {
    let franchise = |id: &str, name: &str, owner: &str, color: &str| Team {
        id: id.to_string(),
        name: name.to_string(),
        owner: owner.to_string(),
        icon_player: None,
        budget: INITIAL_BUDGET,
        max_budget: INITIAL_BUDGET,
        players: Vec::new(),
        color: color.to_string(),
    };

    vec![
        franchise("t1", "Mumbai Titans", "R. Ambani", "bg-blue-600"),
        franchise("t2", "Chennai Kings", "N. Srinivasan", "bg-yellow-500"),
        franchise("t3", "Bangalore Blasters", "Vijay M.", "bg-red-600"),
        franchise("t4", "Delhi Capitals", "Jindal G.", "bg-indigo-600"),
    ]
}
