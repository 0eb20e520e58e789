use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use bb_core::ImageModel;
use bb_core::job::{ExecutionMode, JobConfig, JobId};
use bb_engine::CancelOutcome;

use crate::error::ApiError;
use crate::schemas::{
    GenerateRequest, GenerateResponse, JobResponse, JobsResponse, KeyCheckResponse,
    MessageResponse, ValidateKeyRequest,
};
use crate::state::AppState;

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let api_key = req.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(ApiError::BadRequest("API key is required".to_string()));
    }

    let prompts = req.prompts.into_prompts();
    if prompts.is_empty() {
        return Err(ApiError::BadRequest("No valid prompts provided".to_string()));
    }

    let config = JobConfig {
        model: ImageModel::parse_or_default(req.model.as_deref()),
        mode: ExecutionMode::parse_or_default(req.mode.as_deref()),
        master_prompts: req.master_prompts.unwrap_or_default(),
        suffix: req.suffix.unwrap_or_default(),
        negative_prompts: req.negative_prompts.unwrap_or_default(),
        aspect_ratio: req.aspect_ratio.unwrap_or_else(|| "1:1".to_string()),
    };

    let total = prompts.len();
    let job_id = state.engine.submit(prompts, config, api_key).await;

    Ok(Json(GenerateResponse {
        success: true,
        job_id,
        message: format!("Started generating {total} images"),
        total,
    }))
}

pub async fn validate_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateKeyRequest>,
) -> (StatusCode, Json<KeyCheckResponse>) {
    let api_key = req.api_key.trim();
    if api_key.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(KeyCheckResponse {
                valid: false,
                message: None,
                error: Some("API key is required".to_string()),
            }),
        );
    }

    match state.engine.validate_key(api_key).await {
        Ok(()) => (
            StatusCode::OK,
            Json(KeyCheckResponse {
                valid: true,
                message: Some("API key is valid".to_string()),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(KeyCheckResponse {
                valid: false,
                message: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state
        .engine
        .snapshot(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;
    Ok(Json(JobResponse { success: true, job }))
}

pub async fn list(State(state): State<Arc<AppState>>) -> Json<JobsResponse> {
    Json(JobsResponse {
        success: true,
        jobs: state.engine.list().await,
    })
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<MessageResponse>, ApiError> {
    match state.engine.request_cancel(&id).await {
        None => Err(ApiError::NotFound("Job not found".to_string())),
        Some(CancelOutcome::Requested) => Ok(Json(MessageResponse {
            success: true,
            message: "Cancel requested. Current images will still be shown when done.".to_string(),
        })),
        Some(CancelOutcome::AlreadyFinished) => Ok(Json(MessageResponse {
            success: true,
            message: "Job is not running (already completed or cancelled)".to_string(),
        })),
    }
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.engine.delete(&id).await {
        return Err(ApiError::NotFound("Job not found".to_string()));
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "Job deleted successfully".to_string(),
    }))
}
