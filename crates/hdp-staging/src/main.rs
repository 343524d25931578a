//! HDP Staging - Ingestion staging daemon

use anyhow::{Context, Result};
use clap::Parser;
use hdp_common::logging::{init_logging, LogConfig, LogLevel};
use hdp_staging::{PostgresDestination, StagingConfig, StagingService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hdp-staging")]
#[command(author, version, about = "HDP ingestion staging daemon")]
struct Cli {
    /// Staging root directory (overrides STAGING_ROOT)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("hdp-staging".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let mut config = StagingConfig::from_env()?;
    if let Some(data_dir) = cli.data_dir {
        config.root_dir = data_dir;
    }

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set for the staging daemon")?;
    let destination =
        PostgresDestination::connect(&database_url, config.destination_timeout()).await?;
    destination
        .ensure_schema()
        .await
        .context("Failed to prepare destination inbox")?;

    let service = StagingService::new(config, Arc::new(destination))?;
    info!(root = %service.config().root_dir.display(), "Staging service initialized");

    service.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, stopping scheduler");

    service.stop();
    service.wait().await;

    let stats = service.stats();
    info!(
        runs = stats.runs,
        total_processed = stats.total_processed,
        total_success = stats.total_success,
        total_failed = stats.total_failed,
        "Staging daemon exiting"
    );
    Ok(())
}
