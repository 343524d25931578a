//! `hdp drain` command implementation

use crate::error::Result;
use colored::Colorize;
use hdp_staging::StagingService;

/// Run one drain pass and report the outcome
pub async fn run(service: &StagingService) -> Result<()> {
    let outcome = service.trigger_now().await?;

    println!("{}", "Drain pass finished:".cyan().bold());
    println!("  Success:        {}", outcome.success);
    println!("  Failed:         {}", outcome.failed);
    println!("  Skipped:        {}", outcome.skipped);
    println!("  Retry success:  {}", outcome.retry_success);
    println!("  Retry failed:   {}", outcome.retry_failed);

    if outcome.max_retries_exceeded > 0 {
        println!();
        println!(
            "{}",
            format!(
                "{} package(s) have exhausted their retry budget and need manual resolution.",
                outcome.max_retries_exceeded
            )
            .red()
            .bold()
        );
    }
    if outcome.skipped > 0 {
        println!();
        println!(
            "{}",
            "Skipped packages were left in place; run 'hdp list' to inspect them.".yellow()
        );
    }

    Ok(())
}
