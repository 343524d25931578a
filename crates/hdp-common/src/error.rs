//! Error types for HDP

use thiserror::Error;

/// Result type alias for HDP operations
pub type Result<T> = std::result::Result<T, HdpError>;

/// Main error type for HDP
#[derive(Error, Debug)]
pub enum HdpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Malformed package: {0}")]
    MalformedPackage(String),

    #[error("Destination rejected package: {0}")]
    Destination(String),

    #[error("Retries exhausted for package {package} after {retries} attempts")]
    RetriesExhausted { package: String, retries: u32 },

    #[error("Staging directory unavailable: {dir}: {reason}")]
    DirectoryUnavailable { dir: String, reason: String },

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("A drain pass is already in progress")]
    PassInProgress,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl HdpError {
    /// Build a `DirectoryUnavailable` from the directory path and the
    /// underlying I/O failure. Used wherever a whole-directory scan or
    /// create fails and the entire pass must abort.
    pub fn directory_unavailable(dir: impl Into<String>, source: &std::io::Error) -> Self {
        Self::DirectoryUnavailable {
            dir: dir.into(),
            reason: source.to_string(),
        }
    }

    /// True when the error aborts an entire drain pass rather than being
    /// scoped to a single package.
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::DirectoryUnavailable { .. })
    }
}
