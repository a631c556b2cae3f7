//! meridian-daemon: keeps aggregated price observations fresh.
//!
//! Loads the TOML configuration, opens the observation database, wires the
//! configured sources into an aggregated oracle and polls the configured
//! tokens until Ctrl-C. Every oracle event is logged as JSON.

mod config;
mod events;
mod poll;
mod setup;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use meridian_db::SqliteStore;
use meridian_oracle::SystemClock;

use crate::config::DaemonConfig;
use crate::events::{EventBus, EVENT_BUFFER};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing, RUST_LOG overriding the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Meridian daemon starting");

    // 3. Open database
    let store = if config.storage.in_memory {
        SqliteStore::open_memory()?
    } else {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)?;
        SqliteStore::open(&data_dir.join(meridian_db::DB_FILE_NAME))?
    };

    // 4. Event bus and its JSON logger
    let event_bus = EventBus::new(EVENT_BUFFER);
    let logger = events::spawn_logger(event_bus.subscribe());

    // 5. Aggregated oracle
    let oracle = Arc::new(setup::build_oracle(
        &config,
        store,
        Arc::new(SystemClock),
        Arc::new(event_bus.clone()),
    )?);
    info!(
        quote_token = %oracle.quote_token_symbol(),
        period = oracle.period(),
        oracles = oracle.oracles().len(),
        "aggregator ready"
    );

    // 6. Poll until Ctrl-C
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let poller = tokio::spawn(poll::run(
        oracle,
        config.aggregator.tokens.clone(),
        Duration::from_secs(config.aggregator.poll_interval_secs),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    let _ = shutdown_tx.send(());
    poller.await?;

    // The logger exits once the last bus handle is gone
    let emitted = event_bus.sequence();
    drop(event_bus);
    let logged = logger.await?;

    info!(emitted, logged, "Daemon stopped");
    Ok(())
}
