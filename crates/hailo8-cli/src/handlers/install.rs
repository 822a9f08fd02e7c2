//! `hailo8 install`: run or resume the pipeline.

use anyhow::Result;
use hailo8_core::InstallStatus;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_status_table;

pub async fn execute(ctx: &CliContext) -> Result<bool> {
    let mut installer = ctx.installer()?;
    let completed = installer.install_all().await.map_err(CliError::from)?;

    print_status_table(installer.state());
    if completed {
        println!("\n✓ Hailo8 installation completed successfully");
    } else if let Some(failed) = installer
        .state()
        .components()
        .find(|c| c.status == InstallStatus::Failed)
    {
        println!("\n✗ Installation failed at {}: {}", failed.name, failed.error_msg);
        println!("  Fix the problem and run `hailo8 install` again to resume.");
        println!("  Logs: {}", installer.layout().logs_dir().display());
    }
    Ok(completed)
}
