//! Drain processor
//!
//! Moves packages out of `pending` and `failed` into a resolved state: each
//! pending package is validated and offered to the destination, then routed
//! to `completed` or `failed`; failed packages are re-attempted under a
//! bounded retry budget. Per-package errors are counted, never thrown past
//! the pass boundary; only a systemic error (staging directory unreadable)
//! fails a whole pass.

use crate::destination::Destination;
use crate::store::{PackageRef, StagingDir, StagingStore};
use chrono::Utc;
use hdp_common::types::PackageStatus;
use hdp_common::{HdpError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Counters for one drain pass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PassOutcome {
    /// Pending packages persisted and moved to `completed`
    pub success: u64,
    /// Pending packages rejected by the destination and moved to `failed`
    pub failed: u64,
    /// Packages left in place: corrupt, malformed, or unreadable this pass
    pub skipped: u64,
    /// Failed packages persisted on retry and moved to `completed`
    pub retry_success: u64,
    /// Failed packages that failed again and stay in `failed`
    pub retry_failed: u64,
    /// Failed packages at the retry cap, awaiting manual resolution
    pub max_retries_exceeded: u64,
}

impl PassOutcome {
    /// Total packages that reached a resolved state this pass
    pub fn processed(&self) -> u64 {
        self.success + self.failed + self.retry_success + self.retry_failed
    }

    fn absorb(&mut self, other: PassOutcome) {
        self.success += other.success;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.retry_success += other.retry_success;
        self.retry_failed += other.retry_failed;
        self.max_retries_exceeded += other.max_retries_exceeded;
    }
}

pub struct DrainProcessor {
    store: Arc<StagingStore>,
    destination: Arc<dyn Destination>,
    batch_size: usize,
    max_retries: u32,
}

impl DrainProcessor {
    pub fn new(
        store: Arc<StagingStore>,
        destination: Arc<dyn Destination>,
        batch_size: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            destination,
            batch_size,
            max_retries,
        }
    }

    /// One full pass: retry sweep first, then drain fresh pending packages
    ///
    /// Retries run before the drain so a package that fails for the first
    /// time in this pass is not immediately re-attempted back-to-back; its
    /// first retry waits for the next cycle, giving a transient destination
    /// outage time to clear.
    pub async fn run_pass(&self) -> Result<PassOutcome> {
        let mut outcome = self.retry_failed(self.max_retries).await?;
        outcome.absorb(self.drain_pending().await?);
        info!(
            success = outcome.success,
            failed = outcome.failed,
            skipped = outcome.skipped,
            retry_success = outcome.retry_success,
            retry_failed = outcome.retry_failed,
            max_retries_exceeded = outcome.max_retries_exceeded,
            "Drain pass finished"
        );
        Ok(outcome)
    }

    /// Drain `pending`, oldest first, up to the batch size
    #[instrument(skip(self))]
    pub async fn drain_pending(&self) -> Result<PassOutcome> {
        let mut outcome = PassOutcome::default();
        let refs = self.store.list(StagingDir::Pending)?;

        for r in refs.into_iter().take(self.batch_size) {
            let package = match self.load(&r) {
                Some(p) => p,
                None => {
                    outcome.skipped += 1;
                    continue;
                },
            };

            match self
                .destination
                .store(package.metadata.kind, &package.payload)
                .await
            {
                Ok(()) => {
                    let moved = self.store.move_with_edit(&r, StagingDir::Completed, |p| {
                        p.metadata.status = PackageStatus::Completed;
                        p.metadata.completed_at = Some(Utc::now());
                    });
                    match moved {
                        Ok(_) => outcome.success += 1,
                        Err(e) => {
                            // Destination has the payload; the package stays
                            // pending and the idempotent destination absorbs
                            // the replay on the next cycle.
                            error!(file = %r.file_name, error = %e, "Failed to move package to completed");
                            outcome.skipped += 1;
                        },
                    }
                },
                Err(e) => {
                    warn!(file = %r.file_name, error = %e, "Destination rejected package");
                    let moved = self.store.move_with_edit(&r, StagingDir::Failed, |p| {
                        p.metadata.status = PackageStatus::Failed;
                        p.metadata.failed_at = Some(Utc::now());
                        p.metadata.retry_count = 0;
                    });
                    match moved {
                        Ok(_) => outcome.failed += 1,
                        Err(e) => {
                            error!(file = %r.file_name, error = %e, "Failed to move package to failed");
                            outcome.skipped += 1;
                        },
                    }
                },
            }
        }

        Ok(outcome)
    }

    /// Retry sweep over `failed`
    ///
    /// Every retry attempt, successful or not, increments `retry_count` and
    /// stamps `last_retry_at`. Packages already at `max_retries` are only
    /// counted under `max_retries_exceeded`; they are never attempted again
    /// and wait for manual resolution.
    #[instrument(skip(self))]
    pub async fn retry_failed(&self, max_retries: u32) -> Result<PassOutcome> {
        let mut outcome = PassOutcome::default();
        let refs = self.store.list(StagingDir::Failed)?;

        for r in refs.into_iter().take(self.batch_size) {
            let package = match self.load(&r) {
                Some(p) => p,
                None => {
                    outcome.skipped += 1;
                    continue;
                },
            };

            if package.metadata.retry_count >= max_retries {
                outcome.max_retries_exceeded += 1;
                continue;
            }

            match self
                .destination
                .store(package.metadata.kind, &package.payload)
                .await
            {
                Ok(()) => {
                    let moved = self.store.move_with_edit(&r, StagingDir::Completed, |p| {
                        p.metadata.status = PackageStatus::Completed;
                        p.metadata.retry_count += 1;
                        p.metadata.last_retry_at = Some(Utc::now());
                        p.metadata.completed_at = Some(Utc::now());
                    });
                    match moved {
                        Ok(_) => outcome.retry_success += 1,
                        Err(e) => {
                            error!(file = %r.file_name, error = %e, "Failed to move retried package to completed");
                            outcome.skipped += 1;
                        },
                    }
                },
                Err(e) => {
                    let new_count = package.metadata.retry_count + 1;
                    warn!(
                        file = %r.file_name,
                        retry_count = new_count,
                        error = %e,
                        "Retry attempt failed"
                    );
                    let updated = self.store.update_in_place(&r, |p| {
                        p.metadata.retry_count += 1;
                        p.metadata.last_retry_at = Some(Utc::now());
                    });
                    match updated {
                        Ok(_) => {
                            outcome.retry_failed += 1;
                            if new_count >= max_retries {
                                warn!(
                                    file = %r.file_name,
                                    retries = new_count,
                                    "Retry budget exhausted, package requires manual resolution"
                                );
                            }
                        },
                        Err(e) => {
                            error!(file = %r.file_name, error = %e, "Failed to record retry attempt");
                            outcome.skipped += 1;
                        },
                    }
                },
            }
        }

        Ok(outcome)
    }

    /// Load and validate one package, mapping every per-package failure to a
    /// skip. Corrupt or malformed files are left in place for manual
    /// inspection; ambiguous corruption must not silently disappear.
    fn load(&self, r: &PackageRef) -> Option<crate::package::StagedPackage> {
        match self.store.read(r) {
            Ok(p) => Some(p),
            Err(HdpError::ChecksumMismatch { expected, actual }) => {
                warn!(
                    file = %r.file_name,
                    expected = %expected,
                    actual = %actual,
                    "Checksum mismatch, leaving package in place"
                );
                None
            },
            Err(HdpError::MalformedPackage(reason)) => {
                warn!(file = %r.file_name, reason = %reason, "Malformed package, leaving in place");
                None
            },
            Err(e) => {
                warn!(file = %r.file_name, error = %e, "Package unreadable this pass");
                None
            },
        }
    }
}
