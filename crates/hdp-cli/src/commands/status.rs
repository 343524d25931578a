//! `hdp status` command implementation
//!
//! Shows staging directory counts and the oldest pending age.

use crate::error::Result;
use crate::format::format_age;
use colored::Colorize;
use hdp_staging::StagingService;

/// Show status of the staging directories
pub async fn run(service: &StagingService) -> Result<()> {
    let summary = service.status_summary()?;

    println!("{}", "Staging Status:".cyan().bold());
    println!();
    println!("  Root:      {}", service.config().root_dir.display());
    println!("  Pending:   {}", summary.pending_count);
    println!("  Completed: {}", summary.completed_count);
    if summary.failed_count > 0 {
        println!(
            "  Failed:    {}",
            summary.failed_count.to_string().red().bold()
        );
    } else {
        println!("  Failed:    0");
    }
    println!("  Backup:    {}", summary.backup_count);

    if let Some(age) = summary.oldest_pending_secs {
        println!();
        println!("  Oldest pending package has waited {}", format_age(age));
    }

    if summary.failed_count > 0 {
        println!();
        println!(
            "{}",
            "Some packages have failed; run 'hdp retry' or inspect with 'hdp list failed'.".yellow()
        );
    }

    Ok(())
}
