//! Staging scheduler
//!
//! Runs the drain processor on a fixed cadence in a single background tokio
//! task, plus a daily anchor pass at a configured hour. A pass-in-progress
//! flag keeps a manual trigger and the scheduled loop from draining the same
//! directories concurrently; there is no distributed lock because the
//! staging directories belong to exactly one process.
//!
//! The scheduler is an explicitly owned context object with a documented
//! lifecycle: `start()` / `stop()` are idempotent, cumulative counters reset
//! only when the process restarts.

use crate::drain::{DrainProcessor, PassOutcome};
use crate::store::{StagingDir, StagingStore};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use hdp_common::{HdpError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Cumulative, process-wide drain statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    /// Completed passes since process start
    pub runs: u64,
    pub total_processed: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub total_skipped: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_outcome: Option<PassOutcome>,
    pub last_error: Option<String>,
}

struct SchedulerInner {
    drain: DrainProcessor,
    store: Arc<StagingStore>,
    interval: Duration,
    anchor_hour: u32,
    stale_after: Duration,
    running: AtomicBool,
    stop_requested: AtomicBool,
    pass_in_progress: AtomicBool,
    wake: Notify,
    stats: Mutex<SchedulerStats>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerInner {
    fn stats_mut(&self) -> std::sync::MutexGuard<'_, SchedulerStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one guarded pass. Returns [`HdpError::PassInProgress`] when a
    /// scheduled or manual pass is already draining the directories.
    async fn execute_pass(&self, trigger: &str) -> Result<PassOutcome> {
        if self.pass_in_progress.swap(true, Ordering::SeqCst) {
            warn!(trigger, "Drain pass already in progress, skipping");
            return Err(HdpError::PassInProgress);
        }

        let pass_id = Uuid::new_v4();
        info!(trigger, pass_id = %pass_id, "Drain pass starting");
        let result = self.drain.run_pass().await;
        self.record(&result);

        if let Err(e) = &result {
            error!(trigger, pass_id = %pass_id, error = %e, "Drain pass failed");
        }
        self.warn_if_stale();
        self.pass_in_progress.store(false, Ordering::SeqCst);
        result
    }

    /// Run only the retry sweep, under the same pass guard
    async fn execute_retry(&self, max_retries: u32) -> Result<PassOutcome> {
        if self.pass_in_progress.swap(true, Ordering::SeqCst) {
            warn!("Drain pass already in progress, skipping retry sweep");
            return Err(HdpError::PassInProgress);
        }

        info!(max_retries, "Retry sweep starting");
        let result = self.drain.retry_failed(max_retries).await;
        self.record(&result);
        self.pass_in_progress.store(false, Ordering::SeqCst);
        result
    }

    /// Fold one pass result into the cumulative counters
    fn record(&self, result: &Result<PassOutcome>) {
        let mut stats = self.stats_mut();
        stats.last_run = Some(Utc::now());
        match result {
            Ok(outcome) => {
                stats.runs += 1;
                stats.total_processed += outcome.processed();
                stats.total_success += outcome.success + outcome.retry_success;
                stats.total_failed += outcome.failed + outcome.retry_failed;
                stats.total_skipped += outcome.skipped;
                stats.last_outcome = Some(*outcome);
                stats.last_error = None;
            },
            Err(e) => {
                // A failed pass changed nothing; the next cadence retries.
                stats.last_error = Some(e.to_string());
            },
        }
    }

    /// Staleness alarm: a package sitting in `pending` past the threshold
    /// means every recent pass has failed at the systemic level, or the
    /// scheduler has been down. Purely observational.
    fn warn_if_stale(&self) {
        let Ok(refs) = self.store.list(StagingDir::Pending) else {
            return;
        };
        if let Some(oldest) = refs.first() {
            let age = Utc::now().signed_duration_since(oldest.created_at);
            if age.to_std().map(|a| a > self.stale_after).unwrap_or(false) {
                warn!(
                    file = %oldest.file_name,
                    age_secs = age.num_seconds(),
                    pending = refs.len(),
                    "Oldest pending package is stale"
                );
            }
        }
    }
}

/// Background drain scheduler
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(
        drain: DrainProcessor,
        store: Arc<StagingStore>,
        interval: Duration,
        anchor_hour: u32,
        stale_after: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                drain,
                store,
                interval,
                anchor_hour,
                stale_after,
                running: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                pass_in_progress: AtomicBool::new(false),
                wake: Notify::new(),
                stats: Mutex::new(SchedulerStats::default()),
                handle: Mutex::new(None),
            }),
        }
    }

    /// Start the background loop. Calling while already running is a no-op
    /// with a warning, not an error.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running, ignoring start");
            return;
        }
        self.inner.stop_requested.store(false, Ordering::SeqCst);

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            info!(
                interval_secs = inner.interval.as_secs(),
                anchor_hour = inner.anchor_hour,
                "Staging scheduler started"
            );
            let mut last_anchor: Option<NaiveDate> = None;
            loop {
                if inner.stop_requested.load(Ordering::SeqCst) {
                    break;
                }

                let _ = inner.execute_pass("scheduled").await;

                let now = Utc::now();
                if now.hour() == inner.anchor_hour && last_anchor != Some(now.date_naive()) {
                    last_anchor = Some(now.date_naive());
                    let _ = inner.execute_pass("anchor").await;
                }

                tokio::select! {
                    _ = tokio::time::sleep(inner.interval) => {},
                    _ = inner.wake.notified() => {},
                }
            }
            inner.running.store(false, Ordering::SeqCst);
            info!("Staging scheduler stopped");
        });

        *self
            .inner
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Request a cooperative stop: the next scheduled pass will not start,
    /// but a pass already in flight runs to completion. Idempotent.
    pub fn stop(&self) {
        if !self.inner.running.load(Ordering::SeqCst) {
            warn!("Scheduler not running, ignoring stop");
            return;
        }
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
        info!("Scheduler stop requested");
    }

    /// Await loop termination after [`Scheduler::stop`]
    pub async fn wait(&self) {
        let handle = self
            .inner
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Force an immediate pass without blocking the caller. The pass is
    /// skipped with a warning when one is already running.
    pub fn trigger_now(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let _ = inner.execute_pass("manual").await;
        });
    }

    /// Run one pass and wait for its outcome
    pub async fn run_once(&self) -> Result<PassOutcome> {
        self.inner.execute_pass("manual").await
    }

    /// Run only the retry sweep with an explicit retry budget
    pub async fn retry_once(&self, max_retries: u32) -> Result<PassOutcome> {
        self.inner.execute_retry(max_retries).await
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the cumulative counters
    pub fn stats(&self) -> SchedulerStats {
        self.inner.stats_mut().clone()
    }
}
