//! `hdp retry` command implementation

use crate::error::Result;
use colored::Colorize;
use hdp_staging::StagingService;

/// Run one retry sweep over failed packages
pub async fn run(service: &StagingService, max_retries: Option<u32>) -> Result<()> {
    let outcome = service.retry_failed(max_retries).await?;

    println!("{}", "Retry sweep finished:".cyan().bold());
    println!("  Retry success: {}", outcome.retry_success);
    println!("  Retry failed:  {}", outcome.retry_failed);

    if outcome.max_retries_exceeded > 0 {
        println!();
        println!(
            "{}",
            format!(
                "{} package(s) are at the retry cap; resolve them manually or delete with 'hdp delete failed <file>'.",
                outcome.max_retries_exceeded
            )
            .red()
            .bold()
        );
    }

    Ok(())
}
