use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::cleanup::run_sweep;
use crate::schemas::{
    CleanupRunResponse, CleanupStatusResponse, CleanupSummary, StorageSummary,
};
use crate::state::AppState;

pub async fn run_now(State(state): State<Arc<AppState>>) -> Json<CleanupRunResponse> {
    let days = state.config.auto_cleanup_days;
    let deleted = run_sweep(state.engine.store(), &state.cleanup, days);
    Json(CleanupRunResponse {
        success: true,
        deleted,
        message: format!("Deleted {deleted} old images (older than {days} days)"),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<CleanupStatusResponse> {
    let info = state.cleanup.info();
    let (total_files, total_bytes) = state.engine.store().stats();
    let total_size_mb = (total_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;

    Json(CleanupStatusResponse {
        success: true,
        cleanup: CleanupSummary {
            enabled: state.config.auto_cleanup_enabled,
            last_cleanup: info.last_cleanup,
            next_cleanup: info.next_cleanup,
            files_deleted_last: info.files_deleted_last,
            cleanup_days: state.config.auto_cleanup_days,
        },
        storage: StorageSummary {
            total_files,
            total_size_mb,
        },
    })
}
