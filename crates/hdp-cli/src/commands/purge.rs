//! `hdp purge` command implementation

use crate::error::Result;
use colored::Colorize;
use hdp_staging::StagingService;

/// Purge aged packages from completed and backup
pub async fn run(service: &StagingService, older_than_days: u32) -> Result<()> {
    let outcome = service.purge(older_than_days)?;

    println!("{}", "Retention sweep finished:".cyan().bold());
    println!("  Removed from completed: {}", outcome.completed_removed);
    println!("  Removed from backup:    {}", outcome.backup_removed);
    if outcome.total() == 0 {
        println!();
        println!("Nothing older than {older_than_days} days.");
    }

    Ok(())
}
