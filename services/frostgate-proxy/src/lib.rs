//! Frostgate proxy service: keeps client traffic flowing to a search engine
//! while idle collections hibernate to disk and cold collections are revived
//! on demand.

pub mod engine;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod proxy;
pub mod rest;
pub mod scheduler;
pub mod singleflight;
pub mod snapshot;
pub mod state;

pub use engine::EngineClient;
pub use lifecycle::{LifecycleManager, ReloadOutcome};
pub use rest::build_router;
pub use scheduler::IdleScheduler;
pub use singleflight::ReloadGate;
pub use snapshot::SnapshotStore;
pub use state::{AppState, ProxySettings};

use std::net::SocketAddr;
use std::sync::Arc;

use frostgate_core::{CoreError, CoreResult, FrostgateConfig};
use frostgate_state::{create_sqlite_pool, run_migrations, SqliteStateStore, StateStore};
use proxy::Upstream;
use tokio::net::TcpListener;
use tracing::info;

/// Boots the full Frostgate stack: state store, lifecycle manager, idle
/// scheduler, and the proxy HTTP surface.
pub async fn run_server(config: FrostgateConfig) -> CoreResult<()> {
    info!(settings = %config.summary(), "starting frostgate");

    let pool = create_sqlite_pool(&config.state.database_url, config.state.max_connections)
        .await
        .map_err(|e| CoreError::StorageError(format!("failed to open state store: {e}")))?;
    run_migrations(&pool)
        .await
        .map_err(|e| CoreError::StorageError(format!("failed to run migrations: {e}")))?;
    let store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(pool));

    let engine = Arc::new(EngineClient::new(
        &config.engine.url,
        &config.engine.api_key,
        config.engine.timeout(),
    )?);
    let snapshots = Arc::new(SnapshotStore::new(&config.snapshot.dir));
    let manager = Arc::new(LifecycleManager::new(
        engine,
        snapshots,
        Arc::clone(&store),
        config.lifecycle.max_concurrent_reloads,
    ));

    let scheduler = Arc::new(IdleScheduler::new(
        Arc::clone(&store),
        Arc::clone(&manager),
        &config.scheduler,
    ));
    scheduler.start();

    let upstream = Arc::new(Upstream::new(&config.engine.url, config.engine.timeout())?);
    let state = AppState::new(
        store,
        manager,
        upstream,
        ProxySettings::from_config(&config.lifecycle),
    );

    let app = rest::build_router(state);

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .map_err(|e| CoreError::config(format!("invalid listen address: {e}")))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CoreError::internal(format!("failed to bind to {addr}: {e}")))?;

    info!("frostgate listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CoreError::internal(format!("server error: {e}")))?;

    info!("frostgate shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
    }
}
