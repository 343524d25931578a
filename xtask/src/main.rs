//! Build automation tasks for HDP
//!
//! This tool provides various automation tasks for the HDP project, including:
//! - Generating CLI documentation from source code
//! - Future build-related tasks

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for HDP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate CLI documentation in markdown format
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    // Generate markdown from clap definitions
    let markdown = clap_markdown::help_markdown::<hdp_cli::Cli>();

    let content = format!(
        r#"---
title: CLI Reference
description: Complete command reference for the HDP CLI
---

# HDP CLI Reference

This documentation is auto-generated from the CLI source code. Last updated: {}.

## Overview

`hdp` is the operator CLI for the HDP staging pipeline: inspect the staging
directories, stage payloads by hand, run drain and retry passes, and manage
retention.

## Installation

```bash
git clone https://github.com/datadir-lab/hdp.git
cd hdp
cargo install --path crates/hdp-cli
```

## Quick Start

```bash
# Stage a payload
hdp submit --kind measurement-batch --correlation-key patient-42 '{{"value": 140}}'

# Inspect the staging directories
hdp status
hdp list pending

# Drain into the destination (requires DATABASE_URL)
hdp drain

# Retry failed packages
hdp retry

# Purge resolved packages older than 30 days
hdp purge --older-than-days 30
```

## Commands

{}

## Environment Variables

- `STAGING_ROOT` - Staging root directory (default: `./data/staging`)
- `DATABASE_URL` - Postgres destination, required by `drain` and `retry`
- `RUST_LOG` - Logging level (e.g., `debug`, `info`, `warn`, `error`)

---

*This documentation is automatically generated from the CLI source code. To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    // Create output directory if it doesn't exist
    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    // Write the markdown file
    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
