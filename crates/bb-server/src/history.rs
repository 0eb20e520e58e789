//! Job history: a flat JSON file of finished-job summaries, newest first,
//! capped so it never grows without bound. Results and API keys are not
//! persisted, only the settings needed to rerun a job.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bb_core::ImageModel;
use bb_core::job::{ExecutionMode, Job, JobConfig, JobId, JobStatus};

pub const MAX_HISTORY_JOBS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub model: ImageModel,
    pub mode: ExecutionMode,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub prompts: Vec<String>,
    pub master_prompts: String,
    pub suffix: String,
    pub negative_prompts: String,
    pub aspect_ratio: String,
    pub success_count: usize,
}

impl From<&Job> for HistoryEntry {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            created_at: job.created_at,
            finished_at: job.finished_at,
            status: job.status,
            model: job.config.model,
            mode: job.config.mode,
            total: job.total,
            completed: job.completed,
            failed: job.failed,
            prompts: job.prompts.clone(),
            master_prompts: job.config.master_prompts.clone(),
            suffix: job.config.suffix.clone(),
            negative_prompts: job.config.negative_prompts.clone(),
            aspect_ratio: job.config.aspect_ratio.clone(),
            success_count: job.success_count(),
        }
    }
}

impl HistoryEntry {
    /// Rebuild the job settings for a rerun.
    pub fn to_config(&self) -> JobConfig {
        JobConfig {
            model: self.model,
            mode: self.mode,
            master_prompts: self.master_prompts.clone(),
            suffix: self.suffix.clone(),
            negative_prompts: self.negative_prompts.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("jobs_history.json"),
        }
    }

    /// A missing or unreadable history file is an empty history, never an
    /// error.
    pub async fn load(&self) -> Vec<HistoryEntry> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Ignoring corrupt history file {}: {e}", self.path.display());
                Vec::new()
            }
        }
    }

    async fn save(&self, mut entries: Vec<HistoryEntry>) -> anyhow::Result<()> {
        entries.truncate(MAX_HISTORY_JOBS);
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Prepend an entry (newest first).
    pub async fn add(&self, entry: HistoryEntry) -> anyhow::Result<()> {
        let mut entries = self.load().await;
        entries.insert(0, entry);
        self.save(entries).await
    }

    pub async fn get(&self, id: &JobId) -> Option<HistoryEntry> {
        self.load().await.into_iter().find(|entry| entry.id == *id)
    }

    /// Returns false when no entry with that id existed.
    pub async fn delete(&self, id: &JobId) -> anyhow::Result<bool> {
        let mut entries = self.load().await;
        let before = entries.len();
        entries.retain(|entry| entry.id != *id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(entries).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.save(Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (HistoryStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("bb-history-test-{}", uuid::Uuid::new_v4()));
        (HistoryStore::new(&dir), dir)
    }

    fn entry(total: usize) -> HistoryEntry {
        HistoryEntry {
            id: JobId::new_v4(),
            created_at: Utc::now(),
            finished_at: Some(Utc::now()),
            status: JobStatus::Completed,
            model: ImageModel::default(),
            mode: ExecutionMode::Sequential,
            total,
            completed: total,
            failed: 0,
            prompts: vec!["a cat".to_string(); total],
            master_prompts: String::new(),
            suffix: String::new(),
            negative_prompts: String::new(),
            aspect_ratio: "1:1".to_string(),
            success_count: total,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_newest_first() {
        let (store, dir) = temp_store();
        let first = entry(1);
        let second = entry(2);
        store.add(first.clone()).await.unwrap();
        store.add(second.clone()).await.unwrap();

        let entries = store.load().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, second.id);
        assert_eq!(entries[1].id, first.id);
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let (store, _dir) = temp_store();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let (store, dir) = temp_store();
        for _ in 0..MAX_HISTORY_JOBS + 5 {
            store.add(entry(1)).await.unwrap();
        }
        assert_eq!(store.load().await.len(), MAX_HISTORY_JOBS);
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (store, dir) = temp_store();
        let keep = entry(1);
        let drop = entry(2);
        store.add(keep.clone()).await.unwrap();
        store.add(drop.clone()).await.unwrap();

        assert!(store.delete(&drop.id).await.unwrap());
        assert!(!store.delete(&drop.id).await.unwrap());
        assert!(store.get(&keep.id).await.is_some());

        store.clear().await.unwrap();
        assert!(store.load().await.is_empty());
        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
