use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ImageModel;
use crate::prompt;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Error,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Terminal states accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

impl ExecutionMode {
    /// Parse a client-supplied mode string; anything unrecognized runs
    /// sequentially.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some("parallel") => Self::Parallel,
            _ => Self::Sequential,
        }
    }
}

/// Outcome of one generation attempt, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResult {
    pub status: ResultStatus,
    /// The exact text that was (or would have been) sent to the backend.
    pub prompt: String,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub model: ImageModel,
    pub timestamp: DateTime<Utc>,
}

impl GenerationResult {
    pub fn completed(prompt: String, filename: String, model: ImageModel) -> Self {
        Self {
            status: ResultStatus::Completed,
            prompt,
            filename: Some(filename),
            error: None,
            model,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(prompt: String, error: String, model: ImageModel) -> Self {
        Self {
            status: ResultStatus::Failed,
            prompt,
            filename: None,
            error: Some(error),
            model,
            timestamp: Utc::now(),
        }
    }

    pub fn cancelled(prompt: String, model: ImageModel) -> Self {
        Self {
            status: ResultStatus::Cancelled,
            prompt,
            filename: None,
            error: Some("Cancelled".to_string()),
            model,
            timestamp: Utc::now(),
        }
    }
}

/// Immutable per-job settings, fixed at submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobConfig {
    pub model: ImageModel,
    pub mode: ExecutionMode,
    pub master_prompts: String,
    pub suffix: String,
    pub negative_prompts: String,
    pub aspect_ratio: String,
}

impl JobConfig {
    /// Compose the final backend prompt for one item of this job.
    pub fn compose(&self, item: &str) -> String {
        prompt::compose(
            &self.master_prompts,
            item,
            &self.suffix,
            &self.negative_prompts,
            &self.aspect_ratio,
        )
    }
}

/// One batch submission and its mutable lifecycle state.
///
/// Sequential runs append results in input order; parallel runs assign them
/// by slot so stored order matches input order regardless of completion
/// order. A slot is `None` only while the item is still unresolved; every
/// slot is filled by the time the job reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub prompts: Vec<String>,
    pub config: JobConfig,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<Option<GenerationResult>>,
    pub cancel_requested: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(prompts: Vec<String>, config: JobConfig) -> Self {
        let total = prompts.len();
        let results = match config.mode {
            ExecutionMode::Sequential => Vec::with_capacity(total),
            ExecutionMode::Parallel => vec![None; total],
        };
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            prompts,
            config,
            total,
            completed: 0,
            failed: 0,
            results,
            cancel_requested: false,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// `pending -> processing`, recording the start time. A no-op from any
    /// other state.
    pub fn begin(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Processing;
            self.started_at = Some(Utc::now());
        }
    }

    /// Record one item outcome. `slot` is `None` for append-order
    /// (sequential) recording, `Some(idx)` for slot-stable (parallel)
    /// recording. Ignored once the job is terminal.
    pub fn record(&mut self, slot: Option<usize>, result: GenerationResult) {
        if self.status.is_terminal() {
            return;
        }
        let failed = result.status == ResultStatus::Failed;
        let stored = match slot {
            None => {
                if self.results.len() < self.total {
                    self.results.push(Some(result));
                    true
                } else {
                    false
                }
            }
            Some(idx) => match self.results.get_mut(idx) {
                Some(entry) => {
                    *entry = Some(result);
                    true
                }
                None => false,
            },
        };
        if stored {
            if failed {
                self.failed += 1;
            }
            self.completed = self.results.iter().filter(|r| r.is_some()).count();
        }
    }

    /// Transition into a terminal state, recording the finish time once.
    /// Non-terminal targets and repeated calls are ignored.
    pub fn finish(&mut self, status: JobStatus) {
        if self.status.is_terminal() || !status.is_terminal() {
            return;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// A fault in the runner itself, not attributable to one item. Already
    /// recorded results are preserved.
    pub fn fail_run(&mut self, message: String) {
        if self.status.is_terminal() {
            return;
        }
        self.error = Some(message);
        self.status = JobStatus::Error;
        self.finished_at = Some(Utc::now());
    }

    /// Count of results that actually produced an artifact.
    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .flatten()
            .filter(|r| r.status == ResultStatus::Completed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: ExecutionMode) -> JobConfig {
        JobConfig {
            model: ImageModel::default(),
            mode,
            master_prompts: String::new(),
            suffix: String::new(),
            negative_prompts: String::new(),
            aspect_ratio: "1:1".to_string(),
        }
    }

    fn ok_result(prompt: &str) -> GenerationResult {
        GenerationResult::completed(prompt.to_string(), "img.png".to_string(), ImageModel::default())
    }

    #[test]
    fn test_begin_only_from_pending() {
        let mut job = Job::new(vec!["a".into()], config(ExecutionMode::Sequential));
        job.begin();
        assert_eq!(job.status, JobStatus::Processing);
        let started = job.started_at;
        job.begin();
        assert_eq!(job.started_at, started);
    }

    #[test]
    fn test_sequential_records_append_in_order() {
        let mut job = Job::new(vec!["a".into(), "b".into()], config(ExecutionMode::Sequential));
        job.begin();
        job.record(None, ok_result("a"));
        job.record(
            None,
            GenerationResult::failed("b".into(), "boom".into(), ImageModel::default()),
        );
        assert_eq!(job.completed, 2);
        assert_eq!(job.failed, 1);
        assert_eq!(job.results[0].as_ref().unwrap().prompt, "a");
        assert_eq!(job.results[1].as_ref().unwrap().prompt, "b");
    }

    #[test]
    fn test_parallel_records_are_slot_stable() {
        let mut job = Job::new(
            vec!["a".into(), "b".into(), "c".into()],
            config(ExecutionMode::Parallel),
        );
        job.begin();
        job.record(Some(2), ok_result("c"));
        job.record(Some(0), ok_result("a"));
        assert_eq!(job.completed, 2);
        assert!(job.results[1].is_none());
        assert_eq!(job.results[0].as_ref().unwrap().prompt, "a");
        assert_eq!(job.results[2].as_ref().unwrap().prompt, "c");
    }

    #[test]
    fn test_terminal_jobs_reject_mutation() {
        let mut job = Job::new(vec!["a".into()], config(ExecutionMode::Sequential));
        job.begin();
        job.record(None, ok_result("a"));
        job.finish(JobStatus::Completed);
        let finished = job.finished_at;

        job.record(None, ok_result("late"));
        job.finish(JobStatus::Cancelled);
        job.fail_run("late fault".into());

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed, 1);
        assert_eq!(job.finished_at, finished);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_finish_ignores_non_terminal_target() {
        let mut job = Job::new(vec!["a".into()], config(ExecutionMode::Sequential));
        job.begin();
        job.finish(JobStatus::Processing);
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn test_fail_run_preserves_results() {
        let mut job = Job::new(vec!["a".into(), "b".into()], config(ExecutionMode::Sequential));
        job.begin();
        job.record(None, ok_result("a"));
        job.fail_run("runner exploded".into());
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.completed, 1);
        assert_eq!(job.error.as_deref(), Some("runner exploded"));
    }

    #[test]
    fn test_status_predicates() {
        assert!(JobStatus::Pending.is_active());
        assert!(JobStatus::Processing.is_active());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&ResultStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
