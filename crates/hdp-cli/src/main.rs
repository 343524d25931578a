//! HDP CLI - Main entry point

use clap::Parser;
use hdp_cli::{Cli, Commands};
use hdp_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    // Ensure a command is provided
    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    // Initialize logging based on verbose flag and environment
    let log_config = if cli.verbose {
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Console)
            .log_file_prefix("hdp-cli".to_string())
            .build()
    } else {
        // Normal mode: only warnings and errors reach the console
        LogConfig::builder()
            .level(LogLevel::Warn)
            .output(LogOutput::Console)
            .log_file_prefix("hdp-cli".to_string())
            .build()
    };

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    // Initialize logging (ignore errors as CLI should work without logging)
    let _ = init_logging(&log_config);

    // Execute command
    let result = execute_command(&cli).await;

    // Handle result
    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> hdp_cli::Result<()> {
    // Command is guaranteed to exist at this point (checked in main)
    let Some(ref command) = cli.command else {
        unreachable!("Command should have been validated in main");
    };

    match command {
        Commands::Status => {
            let service = hdp_cli::commands::open_local_service(&cli.data_dir)?;
            hdp_cli::commands::status::run(&service).await
        },
        Commands::List { dir, limit } => {
            let service = hdp_cli::commands::open_local_service(&cli.data_dir)?;
            hdp_cli::commands::list::run(&service, dir, *limit).await
        },
        Commands::Submit {
            kind,
            correlation_key,
            payload,
        } => {
            let service = hdp_cli::commands::open_local_service(&cli.data_dir)?;
            hdp_cli::commands::submit::run(&service, kind, correlation_key, payload).await
        },
        Commands::Drain => {
            let service = hdp_cli::commands::open_connected_service(&cli.data_dir).await?;
            hdp_cli::commands::drain::run(&service).await
        },
        Commands::Retry { max_retries } => {
            let service = hdp_cli::commands::open_connected_service(&cli.data_dir).await?;
            hdp_cli::commands::retry::run(&service, *max_retries).await
        },
        Commands::Purge { older_than_days } => {
            let service = hdp_cli::commands::open_local_service(&cli.data_dir)?;
            hdp_cli::commands::purge::run(&service, *older_than_days).await
        },
        Commands::Delete { dir, file_name } => {
            let service = hdp_cli::commands::open_local_service(&cli.data_dir)?;
            hdp_cli::commands::delete::run(&service, dir, file_name).await
        },
    }
}
