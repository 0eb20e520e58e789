//! Retention cleanup for generated images. Disabled unless configured;
//! when enabled a background task sweeps the output directory every six
//! hours, and the sweep can also be triggered manually over the API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use bb_engine::artifact::ArtifactStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 3600);

#[derive(Debug, Clone, Default)]
pub struct CleanupInfo {
    pub last_cleanup: Option<DateTime<Utc>>,
    pub next_cleanup: Option<DateTime<Utc>>,
    pub files_deleted_last: usize,
}

/// Shared record of what the cleanup last did, read by the status route.
#[derive(Clone, Default)]
pub struct CleanupTracker {
    inner: Arc<Mutex<CleanupInfo>>,
}

impl CleanupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self) -> CleanupInfo {
        self.inner.lock().expect("cleanup state poisoned").clone()
    }

    fn record(&self, deleted: usize) {
        let mut info = self.inner.lock().expect("cleanup state poisoned");
        info.last_cleanup = Some(Utc::now());
        info.files_deleted_last = deleted;
    }

    fn set_next(&self, next: DateTime<Utc>) {
        self.inner.lock().expect("cleanup state poisoned").next_cleanup = Some(next);
    }
}

/// Delete images older than `days` days and record the outcome.
pub fn run_sweep(store: &ArtifactStore, tracker: &CleanupTracker, days: u64) -> usize {
    let max_age = Duration::from_secs(days * 24 * 3600);
    let deleted = store.remove_older_than(max_age);
    tracker.record(deleted);
    log::info!("[auto-cleanup] deleted {deleted} files older than {days} days");
    deleted
}

pub fn spawn_scheduler(
    store: Arc<ArtifactStore>,
    tracker: CleanupTracker,
    days: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            run_sweep(&store, &tracker, days);
            tracker.set_next(Utc::now() + chrono::Duration::hours(6));
            tokio::time::sleep(SWEEP_INTERVAL).await;
        }
    })
}
