//! The engine service object: owns the registry, the backend, and the
//! artifact store, and spawns one lightweight task per submitted job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use bb_core::job::{Job, JobConfig, JobId, ResultStatus};

use crate::artifact::ArtifactStore;
use crate::backend::ImageBackend;
use crate::error::EngineError;
use crate::registry::{CancelOutcome, JobRegistry};
use crate::runner::{self, BatchContext};

/// Runner timing and sizing knobs. Tests shrink these; production keeps
/// the defaults unless configured otherwise.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Hard wall-clock budget per attempt.
    pub timeout: Duration,
    /// Delay between items in sequential mode.
    pub pacing: Duration,
    /// In-flight bound for parallel mode.
    pub max_workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            pacing: Duration::from_millis(500),
            max_workers: 3,
        }
    }
}

pub struct JobEngine {
    registry: Arc<JobRegistry>,
    backend: Arc<dyn ImageBackend>,
    store: Arc<ArtifactStore>,
    options: EngineOptions,
    done_tx: broadcast::Sender<JobId>,
}

impl JobEngine {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        store: Arc<ArtifactStore>,
        options: EngineOptions,
    ) -> Self {
        let (done_tx, _) = broadcast::channel(64);
        Self {
            registry: Arc::new(JobRegistry::new()),
            backend,
            store,
            options,
            done_tx,
        }
    }

    /// Notifications for jobs reaching a terminal state.
    pub fn subscribe(&self) -> broadcast::Receiver<JobId> {
        self.done_tx.subscribe()
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Register a job and start its batch in the background. The returned
    /// id can be polled immediately; the runner reports through the
    /// registry, never directly to the caller.
    pub async fn submit(&self, prompts: Vec<String>, config: JobConfig, api_key: String) -> JobId {
        let (id, cancel) = self.registry.create(prompts.clone(), config.clone()).await;

        let ctx = BatchContext {
            backend: Arc::clone(&self.backend),
            store: Arc::clone(&self.store),
            api_key,
            config,
            options: self.options.clone(),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = tokio::spawn(runner::run_batch(ctx, id, prompts, cancel, tx));

        let registry = Arc::clone(&self.registry);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            registry.mark_started(&id).await;
            info!(job = %short_id(&id), "starting generation");

            // Sole consumer of runner progress; ends when the runner drops
            // its sender.
            while let Some(update) = rx.recv().await {
                let status = update.result.status;
                let cause = update.result.error.clone();
                if let Some((completed, total)) =
                    registry.record(&id, update.slot, update.result).await
                {
                    match status {
                        ResultStatus::Failed => warn!(
                            job = %short_id(&id),
                            "image {completed}/{total} failed: {}",
                            cause.unwrap_or_else(|| "unknown error".to_string())
                        ),
                        _ => info!(job = %short_id(&id), "image {completed}/{total} done"),
                    }
                }
            }

            match runner.await {
                Ok(Ok(status)) => registry.finish(&id, status).await,
                Ok(Err(e)) => {
                    error!(job = %short_id(&id), "batch aborted: {e}");
                    registry.fail_run(&id, e.to_string()).await;
                }
                Err(e) => {
                    error!(job = %short_id(&id), "batch task died: {e}");
                    registry.fail_run(&id, format!("Batch task died: {e}")).await;
                }
            }
            let _ = done_tx.send(id);
        });

        id
    }

    pub async fn snapshot(&self, id: &JobId) -> Option<Job> {
        self.registry.snapshot(id).await
    }

    pub async fn list(&self) -> Vec<Job> {
        self.registry.list().await
    }

    pub async fn request_cancel(&self, id: &JobId) -> Option<CancelOutcome> {
        self.registry.request_cancel(id).await
    }

    /// Remove the job and delete every artifact it produced.
    pub async fn delete(&self, id: &JobId) -> bool {
        let Some(job) = self.registry.remove(id).await else {
            return false;
        };
        for result in job.results.iter().flatten() {
            if let Some(filename) = &result.filename {
                self.store.delete(filename);
            }
        }
        true
    }

    pub async fn validate_key(&self, api_key: &str) -> Result<(), EngineError> {
        self.backend.validate_key(api_key).await
    }
}

fn short_id(id: &JobId) -> String {
    id.to_string().chars().take(8).collect()
}
