//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function. Commands that
//! only touch the staging directories open a local service; `drain` and
//! `retry` additionally connect to the Postgres destination.

pub mod delete;
pub mod drain;
pub mod list;
pub mod purge;
pub mod retry;
pub mod status;
pub mod submit;

use crate::error::{CliError, Result};
use async_trait::async_trait;
use hdp_common::types::PackageKind;
use hdp_staging::destination::{Destination, DestinationError};
use hdp_staging::{PostgresDestination, StagingConfig, StagingService};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Stand-in destination for commands that never drain. Rejects everything so
/// a misrouted call fails loudly instead of writing anywhere.
struct UnconfiguredDestination;

#[async_trait]
impl Destination for UnconfiguredDestination {
    async fn store(
        &self,
        _kind: PackageKind,
        _payload: &Value,
    ) -> std::result::Result<(), DestinationError> {
        Err(DestinationError::Rejected(
            "no destination configured for this command".to_string(),
        ))
    }
}

fn staging_config(data_dir: &Option<PathBuf>) -> Result<StagingConfig> {
    let mut config = StagingConfig::from_env()?;
    if let Some(dir) = data_dir {
        config.root_dir = dir.clone();
    }
    Ok(config)
}

/// Open a service over the staging root for directory-only commands
pub fn open_local_service(data_dir: &Option<PathBuf>) -> Result<StagingService> {
    let config = staging_config(data_dir)?;
    Ok(StagingService::new(config, Arc::new(UnconfiguredDestination))?)
}

/// Open a service wired to the Postgres destination from `DATABASE_URL`
pub async fn open_connected_service(data_dir: &Option<PathBuf>) -> Result<StagingService> {
    let config = staging_config(data_dir)?;
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| CliError::config("DATABASE_URL must be set for this command"))?;

    let destination =
        PostgresDestination::connect(&database_url, config.destination_timeout())
            .await
            .map_err(|e| CliError::destination(e.to_string()))?;
    destination
        .ensure_schema()
        .await
        .map_err(|e| CliError::destination(e.to_string()))?;

    Ok(StagingService::new(config, Arc::new(destination))?)
}

/// Parse a staging directory argument
pub(crate) fn parse_dir(dir: &str) -> Result<hdp_staging::StagingDir> {
    dir.parse().map_err(|_| {
        CliError::invalid_argument(format!(
            "'{dir}' is not a staging directory (expected pending, completed, failed, or backup)"
        ))
    })
}
