mod cleanup;
mod config;
mod error;
mod history;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use bb_engine::artifact::ArtifactStore;
use bb_engine::backend::GeminiBackend;
use bb_engine::{EngineOptions, JobEngine};

use crate::cleanup::CleanupTracker;
use crate::config::ServerConfig;
use crate::history::{HistoryEntry, HistoryStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::load()?;

    let store = Arc::new(ArtifactStore::new(config.output_dir.clone())?);
    let backend = Arc::new(GeminiBackend::new());
    let engine = Arc::new(JobEngine::new(
        backend,
        Arc::clone(&store),
        EngineOptions {
            timeout: Duration::from_secs(config.timeout_seconds),
            max_workers: config.max_workers,
            ..EngineOptions::default()
        },
    ));

    let history = HistoryStore::new(&config.data_dir);
    spawn_history_recorder(Arc::clone(&engine), history.clone());

    let tracker = CleanupTracker::new();
    if config.auto_cleanup_enabled {
        cleanup::spawn_scheduler(store, tracker.clone(), config.auto_cleanup_days);
        info!(
            "auto-cleanup enabled, sweeping every 6 hours (files older than {} days)",
            config.auto_cleanup_days
        );
    } else {
        info!("auto-cleanup disabled");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("generated images will be saved to {}", config.output_dir.display());
    info!("starting batch image generator on port {}", config.port);

    let state = Arc::new(AppState {
        engine,
        history,
        cleanup: tracker,
        config,
    });
    let app = routes::api_routes().with_state(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Copy every job that reaches a terminal state into the on-disk history.
fn spawn_history_recorder(engine: Arc<JobEngine>, history: HistoryStore) {
    let mut done = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match done.recv().await {
                Ok(id) => {
                    let Some(job) = engine.snapshot(&id).await else {
                        continue;
                    };
                    if let Err(e) = history.add(HistoryEntry::from(&job)).await {
                        warn!("failed to record job {id} in history: {e}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("history recorder lagged, {skipped} jobs not recorded");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
