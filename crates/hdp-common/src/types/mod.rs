//! Common types used across HDP

use serde::{Deserialize, Serialize};

/// Checksum algorithm type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
            ChecksumAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Identifies which destination-side handler applies to a staged payload.
///
/// Opaque to the staging layer itself: staging never inspects the payload,
/// it only carries the kind through to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageKind {
    /// A single subject record (demographics, prescriptions, conditions)
    EntityRecord,
    /// A batch of time-series measurements for one subject
    MeasurementBatch,
    /// A batch of clinical documents for one subject
    DocumentBatch,
}

impl PackageKind {
    /// Stable string form, used in filenames and destination dispatch
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::EntityRecord => "entity-record",
            PackageKind::MeasurementBatch => "measurement-batch",
            PackageKind::DocumentBatch => "document-batch",
        }
    }
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PackageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "entity-record" => Ok(PackageKind::EntityRecord),
            "measurement-batch" => Ok(PackageKind::MeasurementBatch),
            "document-batch" => Ok(PackageKind::DocumentBatch),
            _ => Err(anyhow::anyhow!("Invalid package kind: {}", s)),
        }
    }
}

/// Package status, derived from which staging directory holds the package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageStatus::Pending => write!(f, "pending"),
            PackageStatus::Completed => write!(f, "completed"),
            PackageStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for PackageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PackageStatus::Pending),
            "completed" => Ok(PackageStatus::Completed),
            "failed" => Ok(PackageStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid package status: {}", s)),
        }
    }
}
