//! Host requirements: distribution, kernel, PCIe bus, privileges, disk.

use hailo8_core::{InstallComponent, StageError, StageResult};
use tracing::{info, warn};

use crate::installer::context::StageContext;
use crate::system::{free_disk_gb, is_root};

/// Oldest supported kernel major version.
pub const MIN_KERNEL_MAJOR: u32 = 4;

pub async fn install(ctx: &StageContext<'_>, component: &mut InstallComponent) -> StageResult<()> {
    let system = ctx.system;

    if system.is_supported_distro() {
        info!(distro = %system.distro_id, version = %system.distro_version, "Supported distribution");
    } else {
        warn!(distro = %system.distro_id, "Untested distribution, continuing");
    }

    match system.kernel_major() {
        Some(major) if major >= MIN_KERNEL_MAJOR => {
            info!(kernel = %system.kernel_release, "Kernel version OK");
        }
        Some(_) => {
            return Err(StageError::requirement(format!(
                "kernel {} is too old, {MIN_KERNEL_MAJOR}.x or newer is required",
                system.kernel_release
            )));
        }
        None => {
            return Err(StageError::requirement(format!(
                "cannot determine kernel version from '{}'",
                system.kernel_release
            )));
        }
    }

    ctx.require(&["lspci"]).await?;
    if ctx.hardware.pcie_device {
        info!("Hailo PCIe device detected");
    } else {
        warn!("No Hailo PCIe device visible yet");
    }

    if !system.is_supported_arch() {
        warn!(arch = %system.arch, "Untested architecture, continuing");
    }

    if ctx.config.require_root && !is_root() {
        return Err(StageError::requirement("root privileges are required"));
    }

    let root = ctx.layout.root();
    let free = free_disk_gb(root).map_err(|e| StageError::io(root, e))?;
    let needed = ctx.config.min_free_disk_gb;
    if free < needed {
        return Err(StageError::requirement(format!(
            "insufficient disk space: {free:.1} GB free, {needed:.1} GB required"
        )));
    }
    info!(free_gb = %format!("{free:.1}"), "Disk space OK");

    component.version = format!("{} {}", system.distro_id, system.distro_version)
        .trim()
        .to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::testutil::{Fixture, sample_system};
    use hailo8_core::ports::CommandOutput;
    use hailo8_core::testing::ScriptedRunner;
    use hailo8_core::{ComponentType, SystemInfo};

    async fn run(runner: ScriptedRunner, system: SystemInfo) -> StageResult<()> {
        let fixture = Fixture::new(runner);
        let mut entry = InstallComponent::new(ComponentType::SystemCheck, 3);
        let ctx = fixture.context(&system);
        install(&ctx, &mut entry).await
    }

    #[tokio::test]
    async fn passes_on_supported_host() {
        let result = run(ScriptedRunner::healthy_host(), sample_system()).await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn old_kernel_is_rejected() {
        let system = SystemInfo {
            kernel_release: "3.10.0-1160.el7.x86_64".into(),
            ..sample_system()
        };
        let err = run(ScriptedRunner::healthy_host(), system).await.unwrap_err();
        assert!(err.to_string().contains("too old"));
    }

    #[tokio::test]
    async fn unsupported_distro_only_warns() {
        let system = SystemInfo {
            distro_id: "arch".into(),
            ..sample_system()
        };
        assert!(run(ScriptedRunner::healthy_host(), system).await.is_ok());
    }

    #[tokio::test]
    async fn missing_lspci_fails() {
        let runner = ScriptedRunner::healthy_host();
        runner.on(&["lspci"], CommandOutput::spawn_failed("lspci: not found"));
        let err = run(runner, sample_system()).await.unwrap_err();
        assert!(matches!(err, StageError::CommandFailed { .. }));
    }
}
