// Integration tests for the auction desk.
//
// These tests exercise the full system end-to-end through the library
// crate's public API: the sync facade over the embedded store, and the same
// settlement flows driven through the HTTP API server with the remote
// client backend.

use std::sync::Arc;

use auction_desk::api;
use auction_desk::config::{
    BackendKind, Config, CredentialsConfig, LlmConfig, SeedConfig, ServerConfig, StorageConfig,
};
use auction_desk::model::{Player, PlayerRole, PlayerStatus};
use auction_desk::seed;
use auction_desk::store::LocalStore;
use auction_desk::sync::SyncFacade;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Config for a facade over a fresh in-memory store. The seed paths point
/// nowhere, so seeding uses the built-in defaults.
fn local_config() -> Config {
    Config {
        storage: StorageConfig {
            backend: BackendKind::Local,
            db_path: ":memory:".to_string(),
            api_base_url: String::new(),
        },
        server: ServerConfig { port: 8990 },
        seed: SeedConfig {
            players_path: "tests/no-such-players.json".to_string(),
            teams_path: "tests/no-such-teams.json".to_string(),
        },
        llm: LlmConfig {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 300,
        },
        credentials: CredentialsConfig::default(),
    }
}

/// Config for a facade speaking to a live API server.
fn remote_config(base_url: &str) -> Config {
    let mut config = local_config();
    config.storage.backend = BackendKind::Remote;
    config.storage.api_base_url = base_url.to_string();
    config
}

/// Spawn the real API server over an in-memory store on an ephemeral port;
/// returns its base URL.
async fn spawn_api_server() -> String {
    let store = Arc::new(LocalStore::open(":memory:").unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = api::serve(listener, store).await;
    });
    format!("http://{addr}")
}

fn available_player(id: &str, name: &str) -> Player {
    Player {
        id: id.to_string(),
        ..Player::new(name, PlayerRole::Batsman, "India", 100)
    }
}

/// Assert the structural invariants over everything the facade can see:
/// sold status, team membership, and the budget ledger must agree.
async fn assert_invariants(facade: &SyncFacade) {
    let players = facade.players().await.unwrap();
    let teams = facade.teams().await.unwrap();

    for p in &players {
        let sold = p.status == PlayerStatus::Sold;
        assert_eq!(
            p.team_id.is_some(),
            sold,
            "player {}: teamId must be set iff Sold",
            p.id
        );
        let rostered = teams.iter().filter(|t| t.players.contains(&p.id)).count();
        assert_eq!(
            rostered,
            usize::from(sold),
            "player {}: must appear on exactly one roster iff Sold",
            p.id
        );
    }

    for t in &teams {
        let spent: i64 = players
            .iter()
            .filter(|p| p.team_id.as_deref() == Some(t.id.as_str()))
            .filter_map(|p| p.sold_price)
            .sum();
        assert_eq!(
            t.budget,
            t.max_budget - spent,
            "team {}: budget must equal maxBudget minus spent",
            t.id
        );
    }
}

/// Drive the full concrete auction scenario through a facade, asserting
/// invariants after every settlement operation. Used for both backends.
async fn run_auction_scenario(facade: &mut SyncFacade) {
    // Fresh slate regardless of what seeding put in the store.
    facade.delete_all_players().await.unwrap();
    facade.delete_all_teams().await.unwrap();

    let team_a = facade.add_team("Team A", "Owner A", "", 1000).await.unwrap();
    facade.add_player(available_player("x", "Player X")).await.unwrap();
    facade.add_player(available_player("y", "Player Y")).await.unwrap();
    assert_invariants(facade).await;

    // Sell X to A for 200.
    facade.sell("x", &team_a.id, 200).await.unwrap();
    let teams = facade.teams().await.unwrap();
    let a = teams.iter().find(|t| t.id == team_a.id).unwrap();
    assert_eq!(a.budget, 800);
    assert_eq!(a.players, vec!["x".to_string()]);
    let players = facade.players().await.unwrap();
    let x = players.iter().find(|p| p.id == "x").unwrap();
    assert_eq!(x.status, PlayerStatus::Sold);
    assert_eq!(x.team_id, Some(team_a.id.clone()));
    assert_invariants(facade).await;

    // Sell Y to A for 300.
    facade.sell("y", &team_a.id, 300).await.unwrap();
    let teams = facade.teams().await.unwrap();
    let a = teams.iter().find(|t| t.id == team_a.id).unwrap();
    assert_eq!(a.budget, 500);
    assert_eq!(a.players, vec!["x".to_string(), "y".to_string()]);
    assert_invariants(facade).await;

    // Deleting X refunds 200 and shrinks the roster.
    facade.delete_players(&["x".to_string()]).await.unwrap();
    let teams = facade.teams().await.unwrap();
    let a = teams.iter().find(|t| t.id == team_a.id).unwrap();
    assert_eq!(a.budget, 700);
    assert_eq!(a.players, vec!["y".to_string()]);
    assert_invariants(facade).await;

    // Deleting all teams releases Y.
    facade.delete_all_teams().await.unwrap();
    assert!(facade.teams().await.unwrap().is_empty());
    let players = facade.players().await.unwrap();
    let y = players.iter().find(|p| p.id == "y").unwrap();
    assert_eq!(y.status, PlayerStatus::Available);
    assert!(y.team_id.is_none());
    assert!(y.sold_price.is_none());
    assert_invariants(facade).await;
}

// ===========================================================================
// Local backend
// ===========================================================================

#[tokio::test]
async fn local_auction_scenario() {
    let mut facade = SyncFacade::from_config(&local_config()).await.unwrap();
    run_auction_scenario(&mut facade).await;
}

#[tokio::test]
async fn local_sell_then_delete_restores_budget() {
    let mut facade = SyncFacade::from_config(&local_config()).await.unwrap();

    let team = facade.add_team("Kings", "Owner", "", 1000).await.unwrap();
    facade.add_player(available_player("p9", "New Signing")).await.unwrap();

    facade.sell("p9", &team.id, 450).await.unwrap();
    facade.delete_player("p9").await.unwrap();

    let teams = facade.teams().await.unwrap();
    let t = teams.iter().find(|t| t.id == team.id).unwrap();
    assert_eq!(t.budget, 1000);
    assert!(!t.players.contains(&"p9".to_string()));
    assert_invariants(&facade).await;
}

#[tokio::test]
async fn local_reset_returns_to_seed_regardless_of_prior_state() {
    let mut facade = SyncFacade::from_config(&local_config()).await.unwrap();

    // Mangle the state thoroughly first.
    let team = facade.add_team("Scratch", "Owner", "", 5000).await.unwrap();
    facade.add_player(available_player("tmp", "Temp")).await.unwrap();
    facade.sell("tmp", &team.id, 4999).await.unwrap();
    facade.delete_team(&team.id).await.unwrap();

    facade.reset().await.unwrap();

    assert_eq!(facade.players().await.unwrap(), seed::default_players());
    assert_eq!(facade.teams().await.unwrap(), seed::default_teams());
    assert_invariants(&facade).await;
}

#[tokio::test]
async fn local_add_team_never_collides_ids() {
    let mut facade = SyncFacade::from_config(&local_config()).await.unwrap();

    let a = facade.add_team("Kings", "Owner", "IconName", 1000).await.unwrap();
    let b = facade.add_team("Kings", "Owner", "IconName", 1000).await.unwrap();

    assert_eq!(a.budget, 1000);
    assert_eq!(a.max_budget, 1000);
    assert!(a.players.is_empty());
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn local_delete_all_players_is_idempotent() {
    let mut facade = SyncFacade::from_config(&local_config()).await.unwrap();

    // Sell a seeded player so a budget is actually dented.
    facade.sell("p1", "t1", 600).await.unwrap();

    facade.delete_all_players().await.unwrap();
    facade.delete_all_players().await.unwrap();

    assert!(facade.players().await.unwrap().is_empty());
    for team in facade.teams().await.unwrap() {
        assert_eq!(team.budget, team.max_budget);
        assert!(team.players.is_empty());
    }
    assert_invariants(&facade).await;
}

#[tokio::test]
async fn local_delete_team_releases_players() {
    let mut facade = SyncFacade::from_config(&local_config()).await.unwrap();

    facade.sell("p1", "t1", 300).await.unwrap();
    facade.sell("p2", "t1", 200).await.unwrap();

    facade.delete_team("t1").await.unwrap();

    assert!(facade
        .teams()
        .await
        .unwrap()
        .iter()
        .all(|t| t.id != "t1"));
    for player in facade.players().await.unwrap() {
        assert_eq!(player.status, PlayerStatus::Available);
        assert!(player.team_id.is_none());
        assert!(player.sold_price.is_none());
    }
    assert_invariants(&facade).await;
}

// ===========================================================================
// Remote backend through the live API server
// ===========================================================================

#[tokio::test]
async fn remote_auction_scenario_matches_local_semantics() {
    let base = spawn_api_server().await;
    let mut facade = SyncFacade::from_config(&remote_config(&base)).await.unwrap();
    run_auction_scenario(&mut facade).await;
}

#[tokio::test]
async fn remote_reset_seeds_through_the_bulk_endpoint() {
    let base = spawn_api_server().await;
    let mut facade = SyncFacade::from_config(&remote_config(&base)).await.unwrap();

    facade.add_team("Scratch", "Owner", "", 5000).await.unwrap();
    facade.reset().await.unwrap();

    assert_eq!(facade.players().await.unwrap(), seed::default_players());
    assert_eq!(facade.teams().await.unwrap(), seed::default_teams());
}

#[tokio::test]
async fn remote_and_local_agree_on_final_state() {
    let base = spawn_api_server().await;
    let mut remote = SyncFacade::from_config(&remote_config(&base)).await.unwrap();
    let mut local = SyncFacade::from_config(&local_config()).await.unwrap();

    for facade in [&mut local, &mut remote] {
        run_auction_scenario(facade).await;
    }

    // Both backends end in the same place: no teams, one released player.
    let local_players = local.players().await.unwrap();
    let remote_players = remote.players().await.unwrap();
    assert_eq!(local_players, remote_players);
    assert!(local.teams().await.unwrap().is_empty());
    assert!(remote.teams().await.unwrap().is_empty());
}
