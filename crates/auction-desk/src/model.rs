// Domain records: players, teams, and their wire representation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Display color assigned to operator-created teams.
pub const DEFAULT_TEAM_COLOR: &str = "bg-emerald-600";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Playing role of an auction pool player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRole {
    Batsman,
    Bowler,
    #[serde(rename = "All-Rounder")]
    AllRounder,
    #[serde(rename = "Wicket-Keeper")]
    WicketKeeper,
}

impl PlayerRole {
    /// The wire/display label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerRole::Batsman => "Batsman",
            PlayerRole::Bowler => "Bowler",
            PlayerRole::AllRounder => "All-Rounder",
            PlayerRole::WicketKeeper => "Wicket-Keeper",
        }
    }
}

/// Auction status of a player.
///
/// Transitions: `Available -> Sold` (sell), `Available -> Unsold` (unsold),
/// `Sold -> Available` (team deletion / reset). There is no direct
/// `Unsold -> Available` transition; an unsold player re-enters the pool
/// only through a reset or by being sold again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    #[default]
    Available,
    Sold,
    Unsold,
}

impl PlayerStatus {
    /// The wire/display label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerStatus::Available => "Available",
            PlayerStatus::Sold => "Sold",
            PlayerStatus::Unsold => "Unsold",
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Career statistics. Only `matches` is always present; the remaining
/// fields depend on the player's role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub matches: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wickets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub economy: Option<f64>,
    /// Best bowling figures, e.g. "5/24".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best: Option<String>,
}

/// A player in the auction pool.
///
/// Field names serialize as camelCase so seed files and API payloads from
/// the original deployment stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Opaque unique identifier, assigned at creation, immutable.
    pub id: String,
    pub name: String,
    pub role: PlayerRole,
    pub country: String,
    pub base_price: i64,
    pub stats: PlayerStats,
    #[serde(default)]
    pub status: PlayerStatus,
    /// Winning bid. Present iff `status == Sold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_price: Option<i64>,
    /// Owning team. Present iff `status == Sold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batting_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bowling_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_wicket_keeper: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_dates: Option<String>,
}

impl Player {
    /// Create a new Available player with a freshly generated id.
    pub fn new(name: &str, role: PlayerRole, country: &str, base_price: i64) -> Self {
        Player {
            id: next_entity_id("p"),
            name: name.to_string(),
            role,
            country: country.to_string(),
            base_price,
            stats: PlayerStats::default(),
            status: PlayerStatus::Available,
            sold_price: None,
            team_id: None,
            image: None,
            batting_style: None,
            bowling_style: None,
            is_wicket_keeper: None,
            available_dates: None,
        }
    }
}

/// A bidding team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Opaque unique identifier, immutable.
    pub id: String,
    pub name: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_player: Option<String>,
    /// Spendable remainder. Mutated only by settlement operations; can go
    /// negative because the engine performs no affordability check.
    pub budget: i64,
    /// Budget ceiling set at creation; restores `budget` on reset.
    pub max_budget: i64,
    /// Ids of the players this team has won, in acquisition order.
    #[serde(default)]
    pub players: Vec<String>,
    /// Display token.
    pub color: String,
}

impl Team {
    /// Create a new team with `budget == max_budget` and an empty roster.
    pub fn new(name: &str, owner: &str, icon_player: &str, budget: i64) -> Self {
        Team {
            id: next_entity_id("t"),
            name: name.to_string(),
            owner: owner.to_string(),
            icon_player: if icon_player.is_empty() {
                None
            } else {
                Some(icon_player.to_string())
            },
            budget,
            max_budget: budget,
            players: Vec::new(),
            color: DEFAULT_TEAM_COLOR.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Id generation
// ---------------------------------------------------------------------------

static ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh opaque entity id.
///
/// Format: `{prefix}{YYYYMMDDHHMMSSmmm}_{seq}` where `seq` is a process-wide
/// monotonic counter, so two ids generated in the same millisecond never
/// collide.
pub fn next_entity_id(prefix: &str) -> String {
    let now = chrono::Utc::now();
    let seq = ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{}_{seq}", now.format("%Y%m%d%H%M%S%3f"))
}

// ---------------------------------------------------------------------------
// Currency display
// ---------------------------------------------------------------------------

/// Format a rupee amount for display: `₹x.xx Cr` from one crore up,
/// `₹x.xx M` from one million up, otherwise Indian-style digit grouping
/// (`₹1,00,000`).
pub fn format_currency(amount: i64) -> String {
    if amount >= 10_000_000 {
        format!("₹{:.2} Cr", amount as f64 / 10_000_000.0)
    } else if amount >= 1_000_000 {
        format!("₹{:.2} M", amount as f64 / 1_000_000.0)
    } else {
        format!("₹{}", group_indian(amount))
    }
}

/// Indian digit grouping: the last three digits form one group, every two
/// digits before that form another (12,34,567).
fn group_indian(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let digits = amount.unsigned_abs().to_string();
    if digits.len() <= 3 {
        return format!("{sign}{digits}");
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();
    format!("{sign}{},{tail}", groups.join(","))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
