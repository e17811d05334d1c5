//! Oracle aggregator
//!
//! Main entry point: polls the BTC/USD and MON/USD oracles on Monad,
//! records their changes and serves the ranked views over HTTP

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use oracle_core::OracleStore;
use oracle_price_feed::{AggregatorConfig, ChainReader, OracleAggregator};
use oracle_server::{settings, HttpServerBuilder, OracleService};
use oracle_store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting Oracle Aggregator v{}", env!("CARGO_PKG_VERSION"));

    let config = settings::load().context("loading configuration")?;

    let store: Option<Arc<dyn OracleStore>> = match config.storage.database_url.as_deref() {
        Some(url) => {
            let store = SqliteStore::connect(url, config.storage.max_connections)
                .await
                .with_context(|| format!("opening oracle store at {}", url))?;
            info!("Recording oracle changes to {}", url);
            Some(Arc::new(store) as Arc<dyn OracleStore>)
        }
        None => {
            warn!("DATABASE_URL not set, serving without persistence");
            None
        }
    };

    let reader = ChainReader::connect(&config.rpc).context("creating RPC client")?;
    let aggregator = OracleAggregator::new(
        AggregatorConfig::from(&config),
        Arc::new(reader),
        store.clone(),
    );

    let service = OracleService::new(aggregator, store);

    // Start background services
    service.start().await?;
    info!("Background services started");

    let server = HttpServerBuilder::new(service.clone())
        .config(config.server.clone())
        .build();

    // Setup shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
        }

        let _ = shutdown_tx.send(());
    });

    info!("HTTP API listening on {}", server.address());
    info!("Press Ctrl+C to shutdown");

    let result = server.start_with_shutdown(shutdown_rx).await;
    service.stop().await;

    if let Err(e) = result {
        error!("Server error: {:#}", e);
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}
