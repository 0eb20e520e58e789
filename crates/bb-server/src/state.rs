use std::sync::Arc;

use bb_engine::JobEngine;

use crate::cleanup::CleanupTracker;
use crate::config::ServerConfig;
use crate::history::HistoryStore;

pub struct AppState {
    pub engine: Arc<JobEngine>,
    pub history: HistoryStore,
    pub cleanup: CleanupTracker,
    pub config: ServerConfig,
}
