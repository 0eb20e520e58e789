//! Concurrent-safe job registry: the single source of truth for job state.
//! One runner writes per job, any number of readers take snapshots. The
//! lock guards field mutation only and is never held across backend work.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use bb_core::job::{GenerationResult, Job, JobConfig, JobId, JobStatus};

struct JobEntry {
    job: Job,
    cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was active; its token is now cancelled.
    Requested,
    /// The job had already reached a terminal state.
    AlreadyFinished,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending job. Returns its id and the cancellation
    /// token the runner should observe.
    pub async fn create(&self, prompts: Vec<String>, config: JobConfig) -> (JobId, CancellationToken) {
        let job = Job::new(prompts, config);
        let id = job.id;
        let cancel = CancellationToken::new();
        self.jobs.write().await.insert(
            id,
            JobEntry {
                job,
                cancel: cancel.clone(),
            },
        );
        (id, cancel)
    }

    /// Copy of the job as it stands right now. Readers never see the live
    /// mutable state.
    pub async fn snapshot(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).map(|entry| entry.job.clone())
    }

    /// Snapshots of every job, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .map(|entry| entry.job.clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Request cooperative cancellation. Monotonic: once set it stays set;
    /// repeated requests are harmless.
    pub async fn request_cancel(&self, id: &JobId) -> Option<CancelOutcome> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(id)?;
        if !entry.job.status.is_active() {
            return Some(CancelOutcome::AlreadyFinished);
        }
        entry.job.cancel_requested = true;
        entry.cancel.cancel();
        Some(CancelOutcome::Requested)
    }

    pub async fn mark_started(&self, id: &JobId) {
        if let Some(entry) = self.jobs.write().await.get_mut(id) {
            entry.job.begin();
        }
    }

    /// Apply one item outcome. Returns `(completed, total)` after the
    /// update, or `None` if the job no longer exists.
    pub async fn record(
        &self,
        id: &JobId,
        slot: Option<usize>,
        result: GenerationResult,
    ) -> Option<(usize, usize)> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(id)?;
        entry.job.record(slot, result);
        Some((entry.job.completed, entry.job.total))
    }

    pub async fn finish(&self, id: &JobId, status: JobStatus) {
        if let Some(entry) = self.jobs.write().await.get_mut(id) {
            entry.job.finish(status);
        }
    }

    pub async fn fail_run(&self, id: &JobId, message: String) {
        if let Some(entry) = self.jobs.write().await.get_mut(id) {
            entry.job.fail_run(message);
        }
    }

    /// Drop the job, cancelling its runner if one is still going. The
    /// removed job is returned so the caller can release owned artifacts.
    pub async fn remove(&self, id: &JobId) -> Option<Job> {
        let entry = self.jobs.write().await.remove(id)?;
        entry.cancel.cancel();
        Some(entry.job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_core::ImageModel;
    use bb_core::job::ExecutionMode;

    fn config() -> JobConfig {
        JobConfig {
            model: ImageModel::default(),
            mode: ExecutionMode::Sequential,
            master_prompts: String::new(),
            suffix: String::new(),
            negative_prompts: String::new(),
            aspect_ratio: "1:1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let registry = JobRegistry::new();
        let (id, _cancel) = registry.create(vec!["a".into()], config()).await;

        let mut snapshot = registry.snapshot(&id).await.unwrap();
        snapshot.status = JobStatus::Error;

        assert_eq!(
            registry.snapshot(&id).await.unwrap().status,
            JobStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_cancel_is_monotonic_and_idempotent() {
        let registry = JobRegistry::new();
        let (id, cancel) = registry.create(vec!["a".into()], config()).await;
        registry.mark_started(&id).await;

        assert_eq!(
            registry.request_cancel(&id).await,
            Some(CancelOutcome::Requested)
        );
        assert!(cancel.is_cancelled());
        assert_eq!(
            registry.request_cancel(&id).await,
            Some(CancelOutcome::Requested)
        );
        assert!(registry.snapshot(&id).await.unwrap().cancel_requested);
    }

    #[tokio::test]
    async fn test_cancel_after_terminal_reports_finished() {
        let registry = JobRegistry::new();
        let (id, _cancel) = registry.create(vec!["a".into()], config()).await;
        registry.mark_started(&id).await;
        registry.finish(&id, JobStatus::Completed).await;

        assert_eq!(
            registry.request_cancel(&id).await,
            Some(CancelOutcome::AlreadyFinished)
        );
        assert_eq!(registry.request_cancel(&JobId::new_v4()).await, None);
    }

    #[tokio::test]
    async fn test_remove_cancels_and_returns_job() {
        let registry = JobRegistry::new();
        let (id, cancel) = registry.create(vec!["a".into()], config()).await;

        let removed = registry.remove(&id).await.unwrap();
        assert_eq!(removed.id, id);
        assert!(cancel.is_cancelled());
        assert!(registry.snapshot(&id).await.is_none());
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let registry = JobRegistry::new();
        let (first, _) = registry.create(vec!["a".into()], config()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (second, _) = registry.create(vec!["b".into()], config()).await;

        let listed = registry.list().await;
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);
    }
}
