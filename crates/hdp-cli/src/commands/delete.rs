//! `hdp delete` command implementation

use crate::commands::parse_dir;
use crate::error::Result;
use colored::Colorize;
use hdp_staging::StagingService;

/// Administrative deletion; the package is copied into backup first
pub async fn run(service: &StagingService, dir: &str, file_name: &str) -> Result<()> {
    let dir = parse_dir(dir)?;
    service.delete_package(dir, file_name)?;

    println!("{} {dir}/{file_name}", "Deleted".green().bold());
    println!("A copy was kept in the backup directory.");
    Ok(())
}
