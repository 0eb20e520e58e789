use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bb_core::job::{Job, JobId};

use crate::history::HistoryEntry;

/// Prompts arrive either as a newline-joined string or as an array.
/// Blank entries are dropped either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PromptInput {
    Text(String),
    List(Vec<String>),
}

impl PromptInput {
    pub fn into_prompts(self) -> Vec<String> {
        let lines: Vec<String> = match self {
            Self::Text(text) => text.lines().map(str::to_string).collect(),
            Self::List(items) => items,
        };
        lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub api_key: String,
    pub prompts: PromptInput,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    // `prefix` is the pre-rename field name still sent by older clients.
    #[serde(default, alias = "prefix")]
    pub master_prompts: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub negative_prompts: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RerunRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub job_id: JobId,
    pub message: String,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct KeyCheckResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub job: Job,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub success: bool,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub success: bool,
    pub jobs: Vec<HistoryEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryJobResponse {
    pub success: bool,
    pub job: HistoryEntry,
}

#[derive(Debug, Serialize)]
pub struct CleanupRunResponse {
    pub success: bool,
    pub deleted: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CleanupStatusResponse {
    pub success: bool,
    pub cleanup: CleanupSummary,
    pub storage: StorageSummary,
}

#[derive(Debug, Serialize)]
pub struct CleanupSummary {
    pub enabled: bool,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub next_cleanup: Option<DateTime<Utc>>,
    pub files_deleted_last: usize,
    pub cleanup_days: u64,
}

#[derive(Debug, Serialize)]
pub struct StorageSummary {
    pub total_files: usize,
    pub total_size_mb: f64,
}
