//! Accelerator capability probe.

use std::path::PathBuf;
use std::time::Duration;

use hailo8_core::ports::{CommandRunner, CommandSpec};
use hailo8_core::{HailoSettings, HardwareAvailability};
use tracing::debug;

use super::probe::command_exists;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Python one-liner that succeeds when the runtime binding imports.
pub const PYTHON_IMPORT_CHECK: &str = "import hailo_platform";

/// True when `lsmod` lists `module`.
pub async fn module_loaded(runner: &dyn CommandRunner, module: &str) -> bool {
    let out = runner
        .run(&CommandSpec::new("lsmod").timeout(PROBE_TIMEOUT))
        .await;
    out.success()
        && out
            .stdout
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .any(|name| name == module)
}

/// True when `lspci -d <vendor>:` lists at least one device.
pub async fn pcie_device_visible(runner: &dyn CommandRunner, vendor_id: &str) -> bool {
    let out = runner
        .run(&CommandSpec::from_argv(&["lspci", "-d", &format!("{vendor_id}:")]).timeout(PROBE_TIMEOUT))
        .await;
    out.success() && !out.stdout.trim().is_empty()
}

/// Configured device nodes that currently exist.
pub fn present_device_nodes(settings: &HailoSettings) -> Vec<PathBuf> {
    settings
        .device_nodes
        .iter()
        .filter(|node| node.exists())
        .cloned()
        .collect()
}

/// True when the Python runtime binding imports.
pub async fn python_binding_importable(runner: &dyn CommandRunner) -> bool {
    runner
        .run(&CommandSpec::from_argv(&["python3", "-c", PYTHON_IMPORT_CHECK]).timeout(PROBE_TIMEOUT))
        .await
        .success()
}

/// Probe every accelerator capability.
pub async fn probe_hardware(
    runner: &dyn CommandRunner,
    settings: &HailoSettings,
) -> HardwareAvailability {
    let availability = HardwareAvailability {
        pcie_device: pcie_device_visible(runner, &settings.pcie_vendor_id).await,
        driver_loaded: module_loaded(runner, &settings.driver_module).await,
        device_nodes: present_device_nodes(settings),
        runtime_cli: command_exists(runner, "hailortcli").await,
        python_binding: python_binding_importable(runner).await,
        nvidia_gpu: runner
            .run(&CommandSpec::from_argv(&["nvidia-smi", "-L"]).timeout(PROBE_TIMEOUT))
            .await
            .success(),
    };
    debug!(?availability, "Hardware probe complete");
    availability
}
