//! Retention sweeps
//!
//! Bounds disk usage by deleting aged packages from `completed` and `backup`.
//! `pending` and `failed` are never purged regardless of age: they are by
//! definition unresolved, and an operator must explicitly resolve or
//! force-delete them.

use crate::store::{StagingDir, StagingStore};
use hdp_common::{HdpError, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

/// Shortest retention window an operator may request
pub const MIN_RETENTION_DAYS: u32 = 7;

/// Directories a retention sweep is allowed to touch
const PURGEABLE: [StagingDir; 2] = [StagingDir::Completed, StagingDir::Backup];

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PurgeOutcome {
    pub completed_removed: u64,
    pub backup_removed: u64,
}

impl PurgeOutcome {
    pub fn total(&self) -> u64 {
        self.completed_removed + self.backup_removed
    }
}

pub struct Retention {
    store: Arc<StagingStore>,
}

impl Retention {
    pub fn new(store: Arc<StagingStore>) -> Self {
        Self { store }
    }

    /// Delete `completed`/`backup` packages whose modification time is older
    /// than the cutoff. Refuses windows shorter than [`MIN_RETENTION_DAYS`].
    pub fn purge(&self, older_than_days: u32) -> Result<PurgeOutcome> {
        if older_than_days < MIN_RETENTION_DAYS {
            return Err(HdpError::Config(format!(
                "Retention window of {older_than_days} days is below the minimum of {MIN_RETENTION_DAYS}"
            )));
        }
        let cutoff = SystemTime::now() - Duration::from_secs(u64::from(older_than_days) * 86_400);
        self.purge_before(cutoff)
    }

    /// Sweep with an explicit cutoff. Only `completed` and `backup` are
    /// scanned; the protected directories are not even listed.
    pub(crate) fn purge_before(&self, cutoff: SystemTime) -> Result<PurgeOutcome> {
        let mut outcome = PurgeOutcome::default();

        for dir in PURGEABLE {
            let mut removed = 0u64;
            for r in self.store.list(dir)? {
                let path = self.store.file_path(&r);
                let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(file = %r.file_name, error = %e, "Could not stat package, skipping");
                        continue;
                    },
                };
                if modified >= cutoff {
                    continue;
                }
                match self.store.delete(&r) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        warn!(file = %r.file_name, error = %e, "Could not purge package");
                    },
                }
            }
            match dir {
                StagingDir::Completed => outcome.completed_removed = removed,
                StagingDir::Backup => outcome.backup_removed = removed,
                _ => {},
            }
        }

        info!(
            completed_removed = outcome.completed_removed,
            backup_removed = outcome.backup_removed,
            "Retention sweep finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::encode;
    use hdp_common::types::PackageKind;
    use tempfile::TempDir;

    fn seeded_store() -> (Arc<StagingStore>, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(StagingStore::open(tmp.path()).unwrap());
        for dir in StagingDir::all() {
            let package = encode(
                PackageKind::EntityRecord,
                &format!("patient-{dir}"),
                serde_json::json!({"dir": dir.as_str()}),
            );
            store.write(dir, &package).unwrap();
        }
        (store, tmp)
    }

    #[test]
    fn test_purge_rejects_short_windows() {
        let (store, _tmp) = seeded_store();
        let retention = Retention::new(store);
        for days in [0, 1, 6] {
            let err = retention.purge(days).unwrap_err();
            assert!(matches!(err, HdpError::Config(_)), "days={days}");
        }
    }

    #[test]
    fn test_purge_ignores_fresh_files() {
        let (store, _tmp) = seeded_store();
        let retention = Retention::new(store.clone());

        let outcome = retention.purge(7).unwrap();
        assert_eq!(outcome.total(), 0);
        for dir in StagingDir::all() {
            assert_eq!(store.count(dir).unwrap(), 1, "{dir}");
        }
    }

    #[test]
    fn test_purge_never_touches_pending_or_failed() {
        let (store, _tmp) = seeded_store();
        let retention = Retention::new(store.clone());

        // A cutoff in the future makes every file "older than" the window;
        // even then only completed and backup may be removed.
        let future = SystemTime::now() + Duration::from_secs(86_400);
        let outcome = retention.purge_before(future).unwrap();

        assert_eq!(outcome.completed_removed, 1);
        assert_eq!(outcome.backup_removed, 1);
        assert_eq!(store.count(StagingDir::Pending).unwrap(), 1);
        assert_eq!(store.count(StagingDir::Failed).unwrap(), 1);
        assert_eq!(store.count(StagingDir::Completed).unwrap(), 0);
        assert_eq!(store.count(StagingDir::Backup).unwrap(), 0);
    }
}
