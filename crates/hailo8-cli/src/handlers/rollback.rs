//! `hailo8 rollback`: revert the host and reset state.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext) -> Result<bool> {
    let mut installer = ctx.installer()?;
    let summary = installer
        .rollback_installation()
        .await
        .map_err(CliError::from)?;

    if summary.clean() {
        println!("✓ Rollback completed, all components reset to pending");
    } else {
        println!(
            "! Rollback completed with {} of {} steps failing, see the log for details",
            summary.failed, summary.attempted
        );
    }
    Ok(true)
}
