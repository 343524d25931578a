//! Staging pipeline configuration
//!
//! Configuration for the file-staged ingestion pipeline (STAGING_* environment
//! variables).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main staging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Root directory holding the pending/completed/failed/backup layout
    pub root_dir: PathBuf,
    /// Seconds between scheduled drain passes
    pub drain_interval_secs: u64,
    /// Hour of day (UTC) for the daily anchor pass
    pub anchor_hour: u32,
    /// Maximum pending packages loaded in one drain pass
    pub batch_size: usize,
    /// Maximum retry attempts for a failed package
    pub max_retries: u32,
    /// Age in seconds after which a still-pending package is reported stale
    pub stale_after_secs: u64,
    /// Timeout for a single destination store call, in seconds
    pub destination_timeout_secs: u64,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("./data/staging")
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            drain_interval_secs: 120,
            anchor_hour: 2,
            batch_size: 50,
            max_retries: 3,
            stale_after_secs: 3600,
            destination_timeout_secs: 30,
        }
    }
}

impl StagingConfig {
    /// Load staging configuration from environment variables
    ///
    /// - `STAGING_ROOT`: root directory for the staging layout
    /// - `STAGING_DRAIN_INTERVAL_SECS`: seconds between scheduled passes
    /// - `STAGING_ANCHOR_HOUR`: hour (UTC) of the daily anchor pass
    /// - `STAGING_BATCH_SIZE`: max pending packages per pass
    /// - `STAGING_MAX_RETRIES`: retry budget for failed packages
    /// - `STAGING_STALE_AFTER_SECS`: stale-pending warning threshold
    /// - `STAGING_DESTINATION_TIMEOUT_SECS`: per-call destination timeout
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            root_dir: std::env::var("STAGING_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root_dir),
            drain_interval_secs: std::env::var("STAGING_DRAIN_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.drain_interval_secs),
            anchor_hour: std::env::var("STAGING_ANCHOR_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.anchor_hour),
            batch_size: std::env::var("STAGING_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.batch_size),
            max_retries: std::env::var("STAGING_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            stale_after_secs: std::env::var("STAGING_STALE_AFTER_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stale_after_secs),
            destination_timeout_secs: std::env::var("STAGING_DESTINATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.destination_timeout_secs),
        };

        if config.anchor_hour > 23 {
            anyhow::bail!("STAGING_ANCHOR_HOUR must be 0-23, got {}", config.anchor_hour);
        }
        if config.batch_size == 0 {
            anyhow::bail!("STAGING_BATCH_SIZE must be at least 1");
        }

        Ok(config)
    }

    /// Interval between scheduled drain passes
    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }

    /// Timeout for one destination store call
    pub fn destination_timeout(&self) -> Duration {
        Duration::from_secs(self.destination_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StagingConfig::default();
        assert_eq!(config.drain_interval_secs, 120);
        assert_eq!(config.anchor_hour, 2);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.drain_interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_serde_round_trip() {
        let config = StagingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: StagingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batch_size, config.batch_size);
        assert_eq!(back.root_dir, config.root_dir);
    }
}
