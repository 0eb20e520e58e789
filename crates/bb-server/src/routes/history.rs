use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};

use bb_core::job::JobId;

use crate::error::ApiError;
use crate::schemas::{
    GenerateResponse, HistoryJobResponse, HistoryListResponse, MessageResponse, RerunRequest,
};
use crate::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Json<HistoryListResponse> {
    let jobs = state.history.load().await;
    let total = jobs.len();
    Json(HistoryListResponse {
        success: true,
        jobs,
        total,
    })
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<HistoryJobResponse>, ApiError> {
    let job = state
        .history
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Job not found in history".to_string()))?;
    Ok(Json(HistoryJobResponse { success: true, job }))
}

pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.history.delete(&id).await? {
        return Err(ApiError::NotFound("Job not found in history".to_string()));
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "Job deleted from history".to_string(),
    }))
}

pub async fn clear(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.history.clear().await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "All history deleted".to_string(),
    }))
}

/// Start a fresh job reusing a past job's settings. The caller supplies a
/// new API key; keys are never persisted with history.
pub async fn rerun(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
    Json(req): Json<RerunRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let api_key = req.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(ApiError::BadRequest("API key is required".to_string()));
    }

    let entry = state
        .history
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Job not found in history".to_string()))?;

    let total = entry.prompts.len();
    let job_id = state
        .engine
        .submit(entry.prompts.clone(), entry.to_config(), api_key)
        .await;

    Ok(Json(GenerateResponse {
        success: true,
        job_id,
        message: format!("Re-running job with {total} prompts"),
        total,
    }))
}
