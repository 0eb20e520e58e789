use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::state::AppState;

mod cleanup;
mod history;
mod job;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/validate-key", post(job::validate_key))
        .route("/api/generate", post(job::generate))
        .route("/api/cancel/{id}", post(job::cancel))
        .route("/api/status/{id}", get(job::status))
        .route("/api/jobs", get(job::list))
        .route("/api/delete/{id}", delete(job::remove))
        .route("/api/history", get(history::list))
        .route("/api/history/all", delete(history::clear))
        .route("/api/history/{id}", get(history::get_one).delete(history::delete_one))
        .route("/api/rerun/{id}", post(history::rerun))
        .route("/api/cleanup/now", post(cleanup::run_now))
        .route("/api/cleanup/status", get(cleanup::status))
}
