//! `hdp list` command implementation

use crate::commands::parse_dir;
use crate::error::Result;
use crate::format::format_bytes;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use hdp_staging::StagingService;

/// List packages in one staging directory, oldest first
pub async fn run(service: &StagingService, dir: &str, limit: usize) -> Result<()> {
    let dir = parse_dir(dir)?;
    let listings = service.list_packages(dir, limit)?;

    if listings.is_empty() {
        println!("No packages in {dir}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        "File", "Kind", "Correlation", "Status", "Retries", "Size", "Created",
    ]);

    let mut corrupt = 0usize;
    for listing in &listings {
        let status = if listing.corrupt {
            corrupt += 1;
            "CORRUPT".red().bold().to_string()
        } else {
            listing
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        table.add_row(vec![
            listing.file_name.clone(),
            listing
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".to_string()),
            listing.correlation_key.clone().unwrap_or_else(|| "-".to_string()),
            status,
            listing
                .retry_count
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format_bytes(listing.size_bytes),
            listing.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("{} package(s) in {dir}", listings.len());
    if corrupt > 0 {
        println!(
            "{}",
            format!("{corrupt} corrupt package(s); inspect before deleting, the files are left in place.")
                .yellow()
        );
    }

    Ok(())
}
