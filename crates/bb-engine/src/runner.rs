//! Batch runners. Both modes execute one attempt per prompt, honor a
//! cancellation token at item checkpoints, and report every outcome over a
//! progress channel. Cancellation is cooperative: an attempt already in
//! flight is never interrupted harder than its own deadline.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use bb_core::job::{GenerationResult, JobConfig, JobId, JobStatus, ResultStatus};

use crate::artifact::ArtifactStore;
use crate::attempt;
use crate::backend::ImageBackend;
use crate::engine::EngineOptions;
use crate::error::EngineError;

/// Everything a runner needs to execute attempts for one job. The API key
/// travels here, not on the job, so snapshots never expose it.
pub(crate) struct BatchContext {
    pub backend: Arc<dyn ImageBackend>,
    pub store: Arc<ArtifactStore>,
    pub api_key: String,
    pub config: JobConfig,
    pub options: EngineOptions,
}

/// One resolved item, sent to the registry-side consumer as it happens.
/// `slot` is `None` in sequential mode (append order) and `Some(idx)` in
/// parallel mode (input order).
#[derive(Debug)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    pub slot: Option<usize>,
    pub result: GenerationResult,
}

/// Run the whole batch in the mode the job was configured with. Returns the
/// terminal status the job should take; an `Err` is a runner fault, not an
/// item failure.
pub(crate) async fn run_batch(
    ctx: BatchContext,
    job_id: JobId,
    prompts: Vec<String>,
    cancel: CancellationToken,
    tx: UnboundedSender<ProgressUpdate>,
) -> Result<JobStatus, EngineError> {
    ctx.store.ensure_dir()?;
    match ctx.config.mode {
        bb_core::job::ExecutionMode::Sequential => {
            run_sequential(&ctx, job_id, &prompts, &cancel, &tx).await
        }
        bb_core::job::ExecutionMode::Parallel => {
            run_parallel(&ctx, job_id, &prompts, &cancel, &tx).await
        }
    }
}

/// Strict input-order execution. Each item gets the full per-item deadline;
/// a stuck attempt costs at most that deadline before the loop moves on.
/// After cancellation, every unattempted index is drained as a cancelled
/// result so the output always has exactly N entries.
async fn run_sequential(
    ctx: &BatchContext,
    job_id: JobId,
    prompts: &[String],
    cancel: &CancellationToken,
    tx: &UnboundedSender<ProgressUpdate>,
) -> Result<JobStatus, EngineError> {
    let total = prompts.len();
    let mut recorded = 0usize;

    for (idx, item) in prompts.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let prompt = ctx.config.compose(item);

        let result = tokio::select! {
            result = attempt::run(ctx, &prompt, idx + 1) => result,
            _ = cancel.cancelled() => GenerationResult::cancelled(prompt.clone(), ctx.config.model),
        };
        let item_cancelled = result.status == ResultStatus::Cancelled;

        recorded += 1;
        let _ = tx.send(ProgressUpdate {
            job_id,
            slot: None,
            result,
        });

        if item_cancelled || cancel.is_cancelled() {
            break;
        }
        if idx + 1 < total {
            // Pacing between requests so the backend is not hammered.
            tokio::time::sleep(ctx.options.pacing).await;
        }
    }

    if cancel.is_cancelled() {
        for item in prompts.iter().skip(recorded) {
            let prompt = ctx.config.compose(item);
            let _ = tx.send(ProgressUpdate {
                job_id,
                slot: None,
                result: GenerationResult::cancelled(prompt, ctx.config.model),
            });
        }
        Ok(JobStatus::Cancelled)
    } else {
        Ok(JobStatus::Completed)
    }
}

/// Bounded-concurrency execution: at most `max_workers` attempts in flight.
/// Results land in their input-order slot; progress emission order is
/// completion order. Items that never got dispatched before cancellation
/// resolve to cancelled results, so every slot is filled by the end.
async fn run_parallel(
    ctx: &BatchContext,
    job_id: JobId,
    prompts: &[String],
    cancel: &CancellationToken,
    tx: &UnboundedSender<ProgressUpdate>,
) -> Result<JobStatus, EngineError> {
    let semaphore = Arc::new(Semaphore::new(ctx.options.max_workers.max(1)));

    let attempts = prompts.iter().enumerate().map(|(idx, item)| {
        let semaphore = Arc::clone(&semaphore);
        let prompt = ctx.config.compose(item);
        async move {
            let result = run_parallel_item(ctx, semaphore, prompt, idx, cancel).await;
            let _ = tx.send(ProgressUpdate {
                job_id,
                slot: Some(idx),
                result,
            });
        }
    });
    futures::future::join_all(attempts).await;

    if cancel.is_cancelled() {
        Ok(JobStatus::Cancelled)
    } else {
        Ok(JobStatus::Completed)
    }
}

async fn run_parallel_item(
    ctx: &BatchContext,
    semaphore: Arc<Semaphore>,
    prompt: String,
    idx: usize,
    cancel: &CancellationToken,
) -> GenerationResult {
    if cancel.is_cancelled() {
        return GenerationResult::cancelled(prompt, ctx.config.model);
    }

    // Waiting for a worker slot is itself a cancellation checkpoint.
    let permit = tokio::select! {
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        return GenerationResult::cancelled(prompt, ctx.config.model);
    };

    if cancel.is_cancelled() {
        return GenerationResult::cancelled(prompt, ctx.config.model);
    }
    tokio::select! {
        result = attempt::run(ctx, &prompt, idx + 1) => result,
        _ = cancel.cancelled() => GenerationResult::cancelled(prompt.clone(), ctx.config.model),
    }
}
