// Auction API server entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Open the embedded store
// 4. Load seed data on first run
// 5. Serve the HTTP API until Ctrl-C

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use auction_desk::api;
use auction_desk::config;
use auction_desk::seed::{self, SeedSource};
use auction_desk::store::LocalStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Auction desk starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: backend={:?}, db={}, port={}",
        config.storage.backend, config.storage.db_path, config.server.port
    );

    // 3. Open the embedded store. The server always serves the local
    //    database; the `backend = "remote"` setting governs embedding
    //    clients, which point their api_base_url at a server like this one.
    let store = Arc::new(
        LocalStore::open(&config.storage.db_path).context("failed to open database")?,
    );
    info!("Database opened at {}", config.storage.db_path);

    // 4. Load seed data on first run
    let seed_source = SeedSource::new(&config.seed.players_path, &config.seed.teams_path);
    if seed::seed_if_empty(store.as_ref(), &seed_source)
        .await
        .context("failed to load seed data")?
    {
        info!("Seed data loaded");
    }

    // 5. Serve the HTTP API until Ctrl-C
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.server.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server.port))?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(api::serve(listener, store));
    info!("Auction API ready at http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutting down");
    server.abort();

    Ok(())
}

/// Initialize tracing to stderr with an env-filter override
/// (`RUST_LOG=auction_desk=debug` and friends).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auction_desk=info,cricbid=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
