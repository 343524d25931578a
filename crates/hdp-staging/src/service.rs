//! Staging service facade
//!
//! Wires the store, writer, drain, scheduler, and retention together and
//! exposes the operations consumed by the API layer and the operator CLI:
//! submit, trigger, retry, status, purge, list, delete.

use crate::config::StagingConfig;
use crate::destination::Destination;
use crate::drain::{DrainProcessor, PassOutcome};
use crate::package;
use crate::retention::{PurgeOutcome, Retention};
use crate::scheduler::{Scheduler, SchedulerStats};
use crate::store::{StagingDir, StagingStore};
use crate::writer::IngestionWriter;
use chrono::{DateTime, Utc};
use hdp_common::types::{PackageKind, PackageStatus};
use hdp_common::{HdpError, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Directory sizes plus the age of the oldest unresolved package
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub pending_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub backup_count: usize,
    /// Seconds the oldest pending package has been waiting, if any
    pub oldest_pending_secs: Option<i64>,
}

/// One row of operator-facing package introspection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageListing {
    pub file_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub kind: Option<PackageKind>,
    pub correlation_key: Option<String>,
    pub status: Option<PackageStatus>,
    pub retry_count: Option<u32>,
    /// True when the file failed checksum validation or decoding; such
    /// packages are surfaced, never hidden
    pub corrupt: bool,
}

/// Owns one staging pipeline end to end
pub struct StagingService {
    config: StagingConfig,
    store: Arc<StagingStore>,
    writer: IngestionWriter,
    scheduler: Scheduler,
    retention: Retention,
}

impl StagingService {
    /// Build a service over `config.root_dir`, creating the directory layout
    /// if needed
    pub fn new(config: StagingConfig, destination: Arc<dyn Destination>) -> Result<Self> {
        let store = Arc::new(StagingStore::open(config.root_dir.clone())?);
        let writer = IngestionWriter::new(store.clone());
        let drain = DrainProcessor::new(
            store.clone(),
            destination,
            config.batch_size,
            config.max_retries,
        );
        let scheduler = Scheduler::new(
            drain,
            store.clone(),
            config.drain_interval(),
            config.anchor_hour,
            Duration::from_secs(config.stale_after_secs),
        );
        let retention = Retention::new(store.clone());
        Ok(Self {
            config,
            store,
            writer,
            scheduler,
            retention,
        })
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<StagingStore> {
        &self.store
    }

    /// Start the background drain cadence
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Cooperatively stop the background cadence
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Await loop termination after [`StagingService::stop`]
    pub async fn wait(&self) {
        self.scheduler.wait().await;
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stage one payload; returns once the durable write lands
    pub fn submit(
        &self,
        kind: PackageKind,
        correlation_key: &str,
        payload: Value,
    ) -> Result<String> {
        self.writer.submit(kind, correlation_key, payload)
    }

    /// Force an immediate drain pass and wait for its outcome
    pub async fn trigger_now(&self) -> Result<PassOutcome> {
        self.scheduler.run_once().await
    }

    /// Force an immediate drain pass without waiting for it
    pub fn trigger_now_background(&self) {
        self.scheduler.trigger_now();
    }

    /// Explicit retry sweep over `failed`, optionally overriding the
    /// configured retry budget
    pub async fn retry_failed(&self, max_retries: Option<u32>) -> Result<PassOutcome> {
        self.scheduler
            .retry_once(max_retries.unwrap_or(self.config.max_retries))
            .await
    }

    /// Directory sizes for observability
    pub fn status_summary(&self) -> Result<StatusSummary> {
        let pending = self.store.list(StagingDir::Pending)?;
        let oldest_pending_secs = pending
            .first()
            .map(|r| Utc::now().signed_duration_since(r.created_at).num_seconds());
        Ok(StatusSummary {
            pending_count: pending.len(),
            completed_count: self.store.count(StagingDir::Completed)?,
            failed_count: self.store.count(StagingDir::Failed)?,
            backup_count: self.store.count(StagingDir::Backup)?,
            oldest_pending_secs,
        })
    }

    /// Retention sweep; refuses windows shorter than seven days
    pub fn purge(&self, older_than_days: u32) -> Result<PurgeOutcome> {
        self.retention.purge(older_than_days)
    }

    /// Introspect up to `limit` packages in one directory, oldest first.
    /// Corrupt packages are included and flagged rather than hidden.
    pub fn list_packages(&self, dir: StagingDir, limit: usize) -> Result<Vec<PackageListing>> {
        let refs = self.store.list(dir)?;
        let mut listings = Vec::new();

        for r in refs.into_iter().take(limit) {
            match self.store.read(&r) {
                Ok(p) => listings.push(PackageListing {
                    file_name: r.file_name,
                    size_bytes: r.size_bytes,
                    created_at: p.metadata.created_at,
                    kind: Some(p.metadata.kind),
                    correlation_key: Some(p.metadata.correlation_key),
                    status: Some(p.metadata.status),
                    retry_count: Some(p.metadata.retry_count),
                    corrupt: false,
                }),
                Err(HdpError::ChecksumMismatch { .. }) | Err(HdpError::MalformedPackage(_)) => {
                    let stem = r.stem().to_string();
                    listings.push(PackageListing {
                        created_at: r.created_at,
                        size_bytes: r.size_bytes,
                        kind: package::kind_from_stem(&stem),
                        correlation_key: package::key_from_stem(&stem),
                        status: None,
                        retry_count: None,
                        corrupt: true,
                        file_name: r.file_name,
                    });
                },
                Err(e) => {
                    warn!(file = %r.file_name, error = %e, "Skipping unreadable package in listing");
                },
            }
        }

        Ok(listings)
    }

    /// Administrative delete: copies the package into `backup` before
    /// removing the original
    pub fn delete_package(&self, dir: StagingDir, file_name: &str) -> Result<()> {
        let r = self.store.find(dir, file_name)?;
        self.store.delete_with_backup(&r)
    }

    /// Snapshot of the scheduler's cumulative counters
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }
}
