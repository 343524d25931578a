//! Error types for the HDP CLI
//!
//! All errors are user-facing, with clear messages and a suggested fix where
//! one exists.

use hdp_common::HdpError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Staging layer operation failed
    #[error("Staging error: {0}")]
    Staging(#[from] HdpError),

    /// Destination database is missing or unreachable
    #[error("Destination error: {0}. Check DATABASE_URL and that Postgres is reachable.")]
    Destination(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}. Check the payload syntax.")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    /// A command argument does not parse
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a destination error
    pub fn destination(msg: impl Into<String>) -> Self {
        Self::Destination(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
