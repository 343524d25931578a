//! Staging pipeline integration tests
//!
//! These exercise the full submit → drain → retry → resolve lifecycle over a
//! real temporary directory layout, with a scripted in-memory destination to
//! inject failures deterministically.

use async_trait::async_trait;
use hdp_common::types::{PackageKind, PackageStatus};
use hdp_common::HdpError;
use hdp_staging::destination::{Destination, DestinationError};
use hdp_staging::{StagingConfig, StagingDir, StagingService, StagingStore};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Destination double: pops scripted results, then succeeds forever.
/// Counts every store call so retry bounds can be asserted exactly.
struct ScriptedDestination {
    script: Mutex<VecDeque<Result<(), String>>>,
    calls: AtomicU64,
    delay: Option<Duration>,
}

impl ScriptedDestination {
    fn always_ok() -> Arc<Self> {
        Self::with_script(vec![])
    }

    fn with_script(script: Vec<Result<(), String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU64::new(0),
            delay: None,
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
            delay: Some(delay),
        })
    }

    fn always_failing() -> Arc<Self> {
        // An empty script means success, so queue more failures than any
        // bounded retry budget can consume.
        Self::with_script(vec![Err("destination down".to_string()); 64])
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Destination for ScriptedDestination {
    async fn store(
        &self,
        _kind: PackageKind,
        _payload: &Value,
    ) -> Result<(), DestinationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.lock().unwrap().pop_front() {
            None | Some(Ok(())) => Ok(()),
            Some(Err(msg)) => Err(DestinationError::Rejected(msg)),
        }
    }
}

fn test_config(root: &Path) -> StagingConfig {
    StagingConfig {
        root_dir: root.to_path_buf(),
        drain_interval_secs: 3600,
        anchor_hour: 2,
        batch_size: 50,
        max_retries: 3,
        stale_after_secs: 3600,
        destination_timeout_secs: 5,
    }
}

fn service_with(destination: Arc<dyn Destination>) -> (StagingService, TempDir) {
    let tmp = TempDir::new().unwrap();
    let service = StagingService::new(test_config(tmp.path()), destination).unwrap();
    (service, tmp)
}

fn submit_measurement(service: &StagingService) -> String {
    service
        .submit(
            PackageKind::MeasurementBatch,
            "patient-42",
            serde_json::json!({"value": 140}),
        )
        .unwrap()
}

// ============================================================================
// Durability
// ============================================================================

#[tokio::test]
async fn submitted_package_survives_process_restart() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    {
        let service =
            StagingService::new(test_config(&root), ScriptedDestination::always_ok()).unwrap();
        submit_measurement(&service);
        // Service dropped without ever draining: simulated crash.
    }

    let store = StagingStore::open(&root).unwrap();
    let pending = store.list(StagingDir::Pending).unwrap();
    assert_eq!(pending.len(), 1);
    let package = store.read(&pending[0]).unwrap();
    assert_eq!(package.metadata.status, PackageStatus::Pending);
    assert_eq!(package.metadata.correlation_key, "patient-42");
}

// ============================================================================
// Drain lifecycle
// ============================================================================

#[tokio::test]
async fn healthy_destination_drains_to_completed() {
    let destination = ScriptedDestination::always_ok();
    let (service, _tmp) = service_with(destination.clone());

    submit_measurement(&service);
    let outcome = service.trigger_now().await.unwrap();

    assert_eq!(outcome.success, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(destination.calls(), 1);

    let summary = service.status_summary().unwrap();
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.completed_count, 1);
    assert_eq!(summary.failed_count, 0);

    let completed = service.store().list(StagingDir::Completed).unwrap();
    let package = service.store().read(&completed[0]).unwrap();
    assert_eq!(package.metadata.status, PackageStatus::Completed);
    assert!(package.metadata.completed_at.is_some());
}

#[tokio::test]
async fn fail_twice_then_succeed_completes_with_two_retries() {
    let destination = ScriptedDestination::with_script(vec![
        Err("outage".to_string()),
        Err("outage".to_string()),
    ]);
    let (service, _tmp) = service_with(destination.clone());

    submit_measurement(&service);

    // Pass 1: fresh attempt fails, package moves to failed with no retries
    // counted against the budget yet.
    let outcome = service.trigger_now().await.unwrap();
    assert_eq!(outcome.failed, 1);
    assert_eq!(service.store().count(StagingDir::Failed).unwrap(), 1);

    // Pass 2: first retry, still failing.
    let outcome = service.trigger_now().await.unwrap();
    assert_eq!(outcome.retry_failed, 1);

    // Pass 3: second retry succeeds.
    let outcome = service.trigger_now().await.unwrap();
    assert_eq!(outcome.retry_success, 1);

    let summary = service.status_summary().unwrap();
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.failed_count, 0);
    assert_eq!(summary.completed_count, 1);

    let completed = service.store().list(StagingDir::Completed).unwrap();
    let package = service.store().read(&completed[0]).unwrap();
    assert_eq!(package.metadata.retry_count, 2);
    assert!(package.metadata.completed_at.is_some());
    assert!(package.metadata.last_retry_at.is_some());
    assert_eq!(destination.calls(), 3);
}

// ============================================================================
// Corruption handling
// ============================================================================

#[tokio::test]
async fn corrupted_package_is_skipped_in_place() {
    let destination = ScriptedDestination::always_ok();
    let (service, _tmp) = service_with(destination.clone());

    submit_measurement(&service);

    // Flip a payload byte on disk after the durable write.
    let pending = service.store().list(StagingDir::Pending).unwrap();
    let path = service.store().file_path(&pending[0]);
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, contents.replace("140", "141")).unwrap();

    let outcome = service.trigger_now().await.unwrap();
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.success, 0);
    assert_eq!(outcome.failed, 0);
    // Corruption never reaches the destination.
    assert_eq!(destination.calls(), 0);

    let summary = service.status_summary().unwrap();
    assert_eq!(summary.pending_count, 1);
    assert_eq!(summary.completed_count, 0);
    assert_eq!(summary.failed_count, 0);

    // The corrupt file is surfaced, not hidden, in listings.
    let listings = service.list_packages(StagingDir::Pending, 10).unwrap();
    assert_eq!(listings.len(), 1);
    assert!(listings[0].corrupt);
    assert_eq!(listings[0].kind, Some(PackageKind::MeasurementBatch));
}

// ============================================================================
// Retry bounds
// ============================================================================

#[tokio::test]
async fn retry_budget_is_never_exceeded() {
    let destination = ScriptedDestination::always_failing();
    let (service, _tmp) = service_with(destination.clone());

    submit_measurement(&service);

    // Initial attempt plus exactly max_retries (3) retry attempts.
    for _ in 0..6 {
        service.trigger_now().await.unwrap();
    }
    assert_eq!(destination.calls(), 4);

    let failed = service.store().list(StagingDir::Failed).unwrap();
    assert_eq!(failed.len(), 1);
    let package = service.store().read(&failed[0]).unwrap();
    assert_eq!(package.metadata.retry_count, 3);

    // Exhausted packages are reported, untouched, on every subsequent pass.
    let outcome = service.trigger_now().await.unwrap();
    assert_eq!(outcome.max_retries_exceeded, 1);
    assert_eq!(outcome.retry_failed, 0);
    assert_eq!(destination.calls(), 4);
}

#[tokio::test]
async fn explicit_retry_sweep_honors_budget_override() {
    let destination = ScriptedDestination::with_script(vec![Err("outage".to_string())]);
    let (service, _tmp) = service_with(destination.clone());

    submit_measurement(&service);
    service.trigger_now().await.unwrap();
    assert_eq!(service.store().count(StagingDir::Failed).unwrap(), 1);

    // Budget of zero: nothing may be attempted, everything is exhausted.
    let outcome = service.retry_failed(Some(0)).await.unwrap();
    assert_eq!(outcome.max_retries_exceeded, 1);
    assert_eq!(destination.calls(), 1);

    // Default budget: the retry goes through (script is exhausted, so ok).
    let outcome = service.retry_failed(None).await.unwrap();
    assert_eq!(outcome.retry_success, 1);
    assert_eq!(service.store().count(StagingDir::Completed).unwrap(), 1);
}

// ============================================================================
// Scheduler lifecycle
// ============================================================================

#[tokio::test]
async fn scheduler_start_and_stop_are_idempotent() {
    let (service, _tmp) = service_with(ScriptedDestination::always_ok());

    service.start();
    service.start(); // no-op with a warning
    assert!(service.is_running());

    // The loop runs its first pass immediately.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let runs_after_start = service.stats().runs;
    assert!(runs_after_start >= 1);

    service.stop();
    service.stop(); // no-op
    service.wait().await;
    assert!(!service.is_running());

    service.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(service.is_running());
    assert!(service.stats().runs > runs_after_start);

    service.stop();
    service.wait().await;
}

#[tokio::test]
async fn concurrent_passes_are_refused() {
    let destination = ScriptedDestination::slow(Duration::from_millis(300));
    let (service, _tmp) = service_with(destination);
    let service = Arc::new(service);

    submit_measurement(&service);

    let background = {
        let service = service.clone();
        tokio::spawn(async move { service.trigger_now().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The in-flight pass holds the guard; a second trigger is refused
    // instead of double-processing the same directories.
    let err = service.trigger_now().await.unwrap_err();
    assert!(matches!(err, HdpError::PassInProgress));

    let outcome = background.await.unwrap().unwrap();
    assert_eq!(outcome.success, 1);
}

// ============================================================================
// Retention & administration
// ============================================================================

#[tokio::test]
async fn purge_refuses_short_windows() {
    let (service, _tmp) = service_with(ScriptedDestination::always_ok());
    let err = service.purge(3).unwrap_err();
    assert!(matches!(err, HdpError::Config(_)));
}

#[tokio::test]
async fn delete_package_copies_to_backup_first() {
    let (service, _tmp) = service_with(ScriptedDestination::always_ok());
    let id = submit_measurement(&service);
    let file_name = format!("{id}.json");

    service
        .delete_package(StagingDir::Pending, &file_name)
        .unwrap();

    let summary = service.status_summary().unwrap();
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.backup_count, 1);

    let backups = service.store().list(StagingDir::Backup).unwrap();
    assert_eq!(backups[0].file_name, file_name);
}

#[tokio::test]
async fn status_summary_reports_oldest_pending_age() {
    let (service, _tmp) = service_with(ScriptedDestination::always_ok());

    assert!(service.status_summary().unwrap().oldest_pending_secs.is_none());

    submit_measurement(&service);
    let summary = service.status_summary().unwrap();
    assert_eq!(summary.pending_count, 1);
    assert!(summary.oldest_pending_secs.unwrap() >= 0);
}

#[tokio::test]
async fn batch_size_bounds_one_pass() {
    let destination = ScriptedDestination::always_ok();
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.batch_size = 2;
    let service = StagingService::new(config, destination.clone()).unwrap();

    for i in 0..5 {
        service
            .submit(
                PackageKind::EntityRecord,
                &format!("patient-{i}"),
                serde_json::json!({"seq": i}),
            )
            .unwrap();
    }

    let outcome = service.trigger_now().await.unwrap();
    assert_eq!(outcome.success, 2);
    assert_eq!(service.status_summary().unwrap().pending_count, 3);

    // Remaining packages drain on subsequent passes, oldest first.
    service.trigger_now().await.unwrap();
    service.trigger_now().await.unwrap();
    assert_eq!(service.status_summary().unwrap().pending_count, 0);
    assert_eq!(destination.calls(), 5);
}
