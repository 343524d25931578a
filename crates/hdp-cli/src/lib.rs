//! HDP CLI Library
//!
//! Operator command-line interface for the HDP staging pipeline.
//!
//! # Overview
//!
//! The `hdp` CLI works directly against a staging root:
//!
//! - **Status**: directory counts and the oldest pending age (`hdp status`)
//! - **Introspection**: list packages per directory (`hdp list`)
//! - **Staging**: submit a payload by hand (`hdp submit`)
//! - **Draining**: run one drain pass or retry sweep (`hdp drain`, `hdp retry`)
//! - **Retention**: purge aged resolved packages (`hdp purge`)
//! - **Administration**: backup-first deletion (`hdp delete`)

pub mod commands;
pub mod error;
pub mod format;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HDP - Health Data Pipeline staging operator CLI
#[derive(Parser, Debug)]
#[command(name = "hdp")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Staging root directory
    #[arg(long, env = "STAGING_ROOT", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Generate markdown help for documentation
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show staging directory status
    Status,

    /// List packages in a staging directory
    List {
        /// Directory to list (pending, completed, failed, backup)
        #[arg(default_value = "pending")]
        dir: String,

        /// Maximum number of packages to show
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Stage a payload for asynchronous ingestion
    Submit {
        /// Package kind (entity-record, measurement-batch, document-batch)
        #[arg(short, long)]
        kind: String,

        /// Correlation key identifying the logical subject
        #[arg(short = 'c', long)]
        correlation_key: String,

        /// Inline JSON payload, or @path to read it from a file
        payload: String,
    },

    /// Run one drain pass against the destination
    Drain,

    /// Retry failed packages
    Retry {
        /// Override the configured retry budget
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Purge aged packages from completed and backup
    Purge {
        /// Minimum age in days (must be at least 7)
        #[arg(long, default_value_t = 30)]
        older_than_days: u32,
    },

    /// Delete a package; a copy is kept in backup first
    Delete {
        /// Directory holding the package
        dir: String,

        /// Package filename
        file_name: String,
    },
}
