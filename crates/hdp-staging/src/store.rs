//! Directory-backed staging store
//!
//! Four durable directories (`pending`, `completed`, `failed`, `backup`)
//! form a file-based state machine: directory membership *is* the package
//! state, and moves between directories are the only state transitions.
//! All writes go through a temp-file-then-rename so no reader ever observes
//! a half-written package; rename is atomic on the same filesystem.

use crate::package::{self, StagedPackage};
use chrono::{DateTime, Utc};
use hdp_common::{HdpError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One of the four staging directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingDir {
    Pending,
    Completed,
    Failed,
    Backup,
}

impl StagingDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagingDir::Pending => "pending",
            StagingDir::Completed => "completed",
            StagingDir::Failed => "failed",
            StagingDir::Backup => "backup",
        }
    }

    pub fn all() -> [StagingDir; 4] {
        [
            StagingDir::Pending,
            StagingDir::Completed,
            StagingDir::Failed,
            StagingDir::Backup,
        ]
    }
}

impl std::fmt::Display for StagingDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StagingDir {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StagingDir::Pending),
            "completed" => Ok(StagingDir::Completed),
            "failed" => Ok(StagingDir::Failed),
            "backup" => Ok(StagingDir::Backup),
            _ => Err(anyhow::anyhow!("Invalid staging directory: {}", s)),
        }
    }
}

/// Lightweight handle to a package file, as returned by [`StagingStore::list`]
#[derive(Debug, Clone)]
pub struct PackageRef {
    pub dir: StagingDir,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl PackageRef {
    /// Filename without the `.json` extension
    pub fn stem(&self) -> &str {
        self.file_name.trim_end_matches(".json")
    }
}

/// Directory-backed state machine with atomic transitions
#[derive(Debug, Clone)]
pub struct StagingStore {
    root: PathBuf,
}

impl StagingStore {
    /// Open a staging store rooted at `root`, creating the directory layout
    /// if it does not exist yet
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in StagingDir::all() {
            let path = root.join(dir.as_str());
            fs::create_dir_all(&path)
                .map_err(|e| HdpError::directory_unavailable(path.display().to_string(), &e))?;
        }
        Ok(Self { root })
    }

    /// Root of the staging layout
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of one staging directory
    pub fn dir_path(&self, dir: StagingDir) -> PathBuf {
        self.root.join(dir.as_str())
    }

    /// Absolute path of a package file
    pub fn file_path(&self, r: &PackageRef) -> PathBuf {
        self.dir_path(r.dir).join(&r.file_name)
    }

    /// Durably write a package into `dir`
    ///
    /// Serializes to a temp file in the same directory, then renames into
    /// place, so a crash mid-write never leaves a partial package visible.
    pub fn write(&self, dir: StagingDir, package: &StagedPackage) -> Result<PackageRef> {
        let file_name = package.file_name();
        let bytes = package.to_bytes()?;
        self.write_bytes_atomic(dir, &file_name, &bytes)?;
        debug!(dir = %dir, file = %file_name, "Package written");
        Ok(PackageRef {
            dir,
            file_name,
            created_at: package.metadata.created_at,
            size_bytes: bytes.len() as u64,
        })
    }

    fn write_bytes_atomic(&self, dir: StagingDir, file_name: &str, bytes: &[u8]) -> Result<()> {
        let dir_path = self.dir_path(dir);
        let tmp_path = dir_path.join(format!(".{file_name}.tmp"));
        let final_path = dir_path.join(file_name);

        fs::write(&tmp_path, bytes)?;
        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// List packages in `dir`, sorted by creation time ascending
    ///
    /// Ordering comes from the filename's leading compact timestamp; files
    /// with foreign names fall back to their modification time so a
    /// hand-dropped file cannot break a pass. A directory that cannot be
    /// scanned at all is a systemic [`HdpError::DirectoryUnavailable`].
    pub fn list(&self, dir: StagingDir) -> Result<Vec<PackageRef>> {
        let dir_path = self.dir_path(dir);
        let entries = fs::read_dir(&dir_path)
            .map_err(|e| HdpError::directory_unavailable(dir_path.display().to_string(), &e))?;

        let mut refs = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| HdpError::directory_unavailable(dir_path.display().to_string(), &e))?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !file_name.ends_with(".json") || file_name.starts_with('.') {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(dir = %dir, file = %file_name, error = %e, "Skipping unstattable file");
                    continue;
                },
            };

            let created_at = package::created_at_from_stem(
                file_name.trim_end_matches(".json"),
            )
            .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_else(Utc::now);

            refs.push(PackageRef {
                dir,
                file_name,
                created_at,
                size_bytes: metadata.len(),
            });
        }

        refs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(refs)
    }

    /// Build a ref for a known filename, verifying the file exists
    pub fn find(&self, dir: StagingDir, file_name: &str) -> Result<PackageRef> {
        let path = self.dir_path(dir).join(file_name);
        let metadata = fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HdpError::PackageNotFound(format!("{dir}/{file_name}"))
            } else {
                e.into()
            }
        })?;
        let created_at = package::created_at_from_stem(file_name.trim_end_matches(".json"))
            .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_else(Utc::now);
        Ok(PackageRef {
            dir,
            file_name: file_name.to_string(),
            created_at,
            size_bytes: metadata.len(),
        })
    }

    /// Read and checksum-validate one package
    pub fn read(&self, r: &PackageRef) -> Result<StagedPackage> {
        let path = self.file_path(r);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HdpError::PackageNotFound(format!("{}/{}", r.dir, r.file_name))
            } else {
                e.into()
            }
        })?;
        package::decode(&bytes)
    }

    /// Atomically transition a package from its current directory into
    /// `to`, applying `edit` and resealing the checksum on the way
    ///
    /// The new file is fully written before the original is deleted; if the
    /// delete then fails, the new file is removed again so the operation is
    /// all-or-nothing from the caller's perspective and can be retried on
    /// the next cycle.
    pub fn move_with_edit<F>(&self, r: &PackageRef, to: StagingDir, edit: F) -> Result<PackageRef>
    where
        F: FnOnce(&mut StagedPackage),
    {
        let mut package = self.read(r)?;
        edit(&mut package);
        package.reseal();

        let new_ref = self.write(to, &package)?;
        if let Err(e) = fs::remove_file(self.file_path(r)) {
            let _ = fs::remove_file(self.file_path(&new_ref));
            return Err(e.into());
        }
        debug!(from = %r.dir, to = %to, file = %r.file_name, "Package moved");
        Ok(new_ref)
    }

    /// Rewrite a package in place (same directory), applying `edit` and
    /// resealing; uses the same write-then-rename discipline
    pub fn update_in_place<F>(&self, r: &PackageRef, edit: F) -> Result<PackageRef>
    where
        F: FnOnce(&mut StagedPackage),
    {
        let mut package = self.read(r)?;
        edit(&mut package);
        package.reseal();
        self.write(r.dir, &package)
    }

    /// Copy a package into `backup` without touching the original
    pub fn copy_to_backup(&self, r: &PackageRef) -> Result<()> {
        let bytes = fs::read(self.file_path(r))?;
        self.write_bytes_atomic(StagingDir::Backup, &r.file_name, &bytes)
    }

    /// Remove a package file. Reserved for retention sweeps; administrative
    /// deletion goes through [`StagingStore::delete_with_backup`].
    pub fn delete(&self, r: &PackageRef) -> Result<()> {
        fs::remove_file(self.file_path(r))?;
        Ok(())
    }

    /// Administrative delete: the package is copied into `backup` before the
    /// original is removed. Deletion without a backup copy is not offered.
    pub fn delete_with_backup(&self, r: &PackageRef) -> Result<()> {
        if r.dir != StagingDir::Backup {
            self.copy_to_backup(r)?;
        }
        self.delete(r)
    }

    /// Whether a package file with this name exists in `dir`
    pub fn exists(&self, dir: StagingDir, file_name: &str) -> bool {
        self.dir_path(dir).join(file_name).exists()
    }

    /// Number of packages currently in `dir`
    pub fn count(&self, dir: StagingDir) -> Result<usize> {
        Ok(self.list(dir)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::encode;
    use hdp_common::types::{PackageKind, PackageStatus};
    use tempfile::TempDir;

    fn open_store() -> (StagingStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = StagingStore::open(tmp.path().join("staging")).unwrap();
        (store, tmp)
    }

    #[test]
    fn test_open_creates_layout() {
        let (store, _tmp) = open_store();
        for dir in StagingDir::all() {
            assert!(store.dir_path(dir).is_dir(), "{dir} missing");
        }
    }

    #[test]
    fn test_write_then_list_round_trip() {
        let (store, _tmp) = open_store();
        let package = encode(
            PackageKind::EntityRecord,
            "patient-1",
            serde_json::json!({"name": "A"}),
        );
        let r = store.write(StagingDir::Pending, &package).unwrap();

        let listed = store.list(StagingDir::Pending).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name, r.file_name);

        let read_back = store.read(&listed[0]).unwrap();
        assert_eq!(read_back.checksum, package.checksum);
    }

    #[test]
    fn test_list_ignores_temp_files() {
        let (store, _tmp) = open_store();
        std::fs::write(
            store.dir_path(StagingDir::Pending).join(".half-written.json.tmp"),
            b"{",
        )
        .unwrap();
        assert!(store.list(StagingDir::Pending).unwrap().is_empty());
    }

    #[test]
    fn test_list_sorts_oldest_first() {
        let (store, _tmp) = open_store();
        for i in 0..5 {
            let package = encode(
                PackageKind::MeasurementBatch,
                &format!("patient-{i}"),
                serde_json::json!({"seq": i}),
            );
            store.write(StagingDir::Pending, &package).unwrap();
        }

        let listed = store.list(StagingDir::Pending).unwrap();
        assert_eq!(listed.len(), 5);
        for pair in listed.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn test_move_with_edit_transitions_exactly_once() {
        let (store, _tmp) = open_store();
        let package = encode(
            PackageKind::EntityRecord,
            "patient-2",
            serde_json::json!({"name": "B"}),
        );
        let r = store.write(StagingDir::Pending, &package).unwrap();

        let moved = store
            .move_with_edit(&r, StagingDir::Completed, |p| {
                p.metadata.status = PackageStatus::Completed;
                p.metadata.completed_at = Some(Utc::now());
            })
            .unwrap();

        assert_eq!(store.count(StagingDir::Pending).unwrap(), 0);
        assert_eq!(store.count(StagingDir::Completed).unwrap(), 1);

        let read_back = store.read(&moved).unwrap();
        assert_eq!(read_back.metadata.status, PackageStatus::Completed);
        assert!(read_back.metadata.completed_at.is_some());
        // Resealed checksum still validates after the edit
        read_back.verify().unwrap();
    }

    #[test]
    fn test_update_in_place_keeps_directory() {
        let (store, _tmp) = open_store();
        let package = encode(
            PackageKind::DocumentBatch,
            "patient-3",
            serde_json::json!({"doc": "x"}),
        );
        let r = store.write(StagingDir::Failed, &package).unwrap();

        store
            .update_in_place(&r, |p| {
                p.metadata.retry_count += 1;
                p.metadata.last_retry_at = Some(Utc::now());
            })
            .unwrap();

        assert_eq!(store.count(StagingDir::Failed).unwrap(), 1);
        let read_back = store.read(&r).unwrap();
        assert_eq!(read_back.metadata.retry_count, 1);
    }

    #[test]
    fn test_delete_with_backup_copies_first() {
        let (store, _tmp) = open_store();
        let package = encode(
            PackageKind::EntityRecord,
            "patient-4",
            serde_json::json!({"name": "D"}),
        );
        let r = store.write(StagingDir::Completed, &package).unwrap();

        store.delete_with_backup(&r).unwrap();

        assert_eq!(store.count(StagingDir::Completed).unwrap(), 0);
        let backups = store.list(StagingDir::Backup).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].file_name, r.file_name);
    }

    #[test]
    fn test_read_missing_file_is_package_not_found() {
        let (store, _tmp) = open_store();
        let err = store.find(StagingDir::Pending, "nope.json").unwrap_err();
        assert!(matches!(err, HdpError::PackageNotFound(_)));
    }

    #[test]
    fn test_list_unreadable_root_is_directory_unavailable() {
        let tmp = TempDir::new().unwrap();
        let store = StagingStore::open(tmp.path().join("staging")).unwrap();
        std::fs::remove_dir_all(store.dir_path(StagingDir::Pending)).unwrap();

        let err = store.list(StagingDir::Pending).unwrap_err();
        assert!(err.is_systemic());
    }
}
