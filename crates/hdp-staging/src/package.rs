//! Package codec
//!
//! Builds and validates the self-describing package format: metadata plus an
//! opaque JSON payload, sealed with a SHA-256 checksum over the canonical
//! serialization of `{kind, correlation_key, payload}`. The checksum is
//! recomputed on every read so on-disk corruption is detected before a
//! package is trusted.

use chrono::{DateTime, Utc};
use hdp_common::checksum::digest_bytes;
use hdp_common::types::{ChecksumAlgorithm, PackageKind, PackageStatus};
use hdp_common::{HdpError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compact timestamp used as the filename prefix. Microsecond precision keeps
/// ids unique for same-key same-kind submissions in the same instant.
const CREATED_AT_COMPACT: &str = "%Y%m%dT%H%M%S%6f";

/// Package metadata carried alongside the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    /// Logical subject of the payload (e.g., a patient identifier), carried
    /// through unchanged to the destination
    pub correlation_key: String,
    pub kind: PackageKind,
    pub created_at: DateTime<Utc>,
    pub status: PackageStatus,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_retry_at: Option<DateTime<Utc>>,
}

/// One durably-staged unit of data awaiting persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedPackage {
    pub metadata: PackageMetadata,
    pub payload: Value,
    pub checksum: String,
}

/// Checksum input: the canonical serialization of the immutable package
/// content. `serde_json::Value` keeps object keys in sorted order, so the
/// same logical content always yields the same byte stream regardless of
/// in-memory map ordering.
fn content_digest(kind: PackageKind, correlation_key: &str, payload: &Value) -> String {
    let canonical = serde_json::json!({
        "correlationKey": correlation_key,
        "kind": kind,
        "payload": payload,
    });
    digest_bytes(canonical.to_string().as_bytes(), ChecksumAlgorithm::Sha256)
}

/// Build a new pending package around a payload, stamping `created_at` and
/// sealing the checksum
pub fn encode(kind: PackageKind, correlation_key: &str, payload: Value) -> StagedPackage {
    let checksum = content_digest(kind, correlation_key, &payload);
    StagedPackage {
        metadata: PackageMetadata {
            correlation_key: correlation_key.to_string(),
            kind,
            created_at: Utc::now(),
            status: PackageStatus::Pending,
            retry_count: 0,
            completed_at: None,
            failed_at: None,
            last_retry_at: None,
        },
        payload,
        checksum,
    }
}

/// Decode a package from its on-disk bytes
///
/// Fails with [`HdpError::MalformedPackage`] when required fields are missing
/// and with [`HdpError::ChecksumMismatch`] when the recomputed checksum
/// disagrees with the stored one. A mismatched package must never be handed
/// to a destination.
pub fn decode(bytes: &[u8]) -> Result<StagedPackage> {
    let package: StagedPackage =
        serde_json::from_slice(bytes).map_err(|e| HdpError::MalformedPackage(e.to_string()))?;
    package.verify()?;
    Ok(package)
}

impl StagedPackage {
    /// Recompute the checksum and compare against the stored value
    pub fn verify(&self) -> Result<()> {
        let actual = content_digest(
            self.metadata.kind,
            &self.metadata.correlation_key,
            &self.payload,
        );
        if actual == self.checksum {
            Ok(())
        } else {
            Err(HdpError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            })
        }
    }

    /// Recompute and store the checksum after a metadata edit. Checksummed
    /// fields are immutable after creation, so the value only changes if the
    /// content itself was tampered with; resealing keeps the invariant that
    /// the stored checksum always matches the current file content.
    pub fn reseal(&mut self) {
        self.checksum = content_digest(
            self.metadata.kind,
            &self.metadata.correlation_key,
            &self.payload,
        );
    }

    /// Re-stamp `created_at` with the current instant. Used by the writer
    /// when two submissions for the same key and kind land in the same
    /// microsecond and would collide on the filename.
    pub fn restamp(&mut self) {
        self.metadata.created_at = Utc::now();
    }

    /// Package id, used as the on-disk filename stem:
    /// `{createdAtCompact}_{correlationKey}_{kind}`
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.metadata.created_at.format(CREATED_AT_COMPACT),
            sanitize_key(&self.metadata.correlation_key),
            self.metadata.kind
        )
    }

    /// On-disk filename for this package
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id())
    }

    /// Serialize for durable storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Make a correlation key safe to embed in a filename
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// Parse the creation timestamp back out of a filename stem
pub fn created_at_from_stem(stem: &str) -> Option<DateTime<Utc>> {
    let compact = stem.split('_').next()?;
    chrono::NaiveDateTime::parse_from_str(compact, CREATED_AT_COMPACT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse the package kind back out of a filename stem
pub fn kind_from_stem(stem: &str) -> Option<PackageKind> {
    stem.rsplit('_').next()?.parse().ok()
}

/// Parse the sanitized correlation key back out of a filename stem
pub fn key_from_stem(stem: &str) -> Option<String> {
    let after_ts = stem.split_once('_')?.1;
    let (key, _kind) = after_ts.rsplit_once('_')?;
    Some(key.to_string())
}
