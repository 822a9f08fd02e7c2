//! `hailo8 probe`: print what the installer sees on this host.

use anyhow::Result;
use hailo8_runtime::system::{detect_system_info, probe_hardware};

use crate::bootstrap::CliContext;
use crate::presentation::print_hardware;

pub async fn execute(ctx: &CliContext) -> Result<bool> {
    let runner = ctx.runner.as_ref();
    let system = detect_system_info(runner).await;
    let hardware = probe_hardware(runner, &ctx.config.hailo).await;
    print_hardware(&system, &hardware);
    Ok(true)
}
