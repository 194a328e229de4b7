//! Redress API service binary
//!
//! Wires the store, the ledger client, the event projector, and the REST
//! router together. The projector is started before the server accepts
//! requests and is shut down through its handle after the server drains.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use prometheus::Registry;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redress_api::{router, ApiConfig, AppState};
use redress_ledger::{DevLedger, MemoryEvidenceStore};
use redress_sync::{EventProjector, GrievanceService, MemorySyncStore, PgSyncStore, SyncStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Redress API v{}", redress_common::VERSION);

    let config = ApiConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let store: Arc<dyn SyncStore> = match &config.database_url {
        Some(url) => {
            let store = PgSyncStore::connect(url)
                .await
                .map_err(|err| anyhow::anyhow!("postgres connection failed: {err}"))?;
            info!("Using Postgres sync store");
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory sync store");
            Arc::new(MemorySyncStore::new())
        }
    };

    // Dev ledger stands in for the external chain; it finalizes pending
    // writes on a fixed interval
    let ledger = DevLedger::new();
    let miner = ledger.spawn_auto_mine(Duration::from_millis(config.mine_interval_ms));

    let evidence = Arc::new(MemoryEvidenceStore::new());

    let projector = EventProjector::new(store.clone(), Arc::new(ledger.clone()));
    let registry = Arc::new(Registry::new());
    projector.metrics().register(&registry)?;
    let projector_handle = projector.start().await?;
    info!("Event projector running");

    let service = Arc::new(GrievanceService::new(
        store,
        Arc::new(ledger.clone()),
        evidence,
    ));

    let state = AppState { service, registry };
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Redress API listening on {}", addr);

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    projector_handle.shutdown().await;
    miner.abort();
    info!("Shutting down Redress API");
    Ok(())
}
