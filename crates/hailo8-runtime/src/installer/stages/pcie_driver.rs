//! PCIe kernel driver package and module.
//!
//! Rollback data:
//! - `driver_package`: the installed `.deb`
//! - `lsmod_snapshot`, `lspci_snapshot`: pre-install listings in the backup dir
//! - `module_loaded_before`: whether the module was already loaded
//!
//! Snapshots are taken on the first attempt only, so retries and repairs
//! keep describing the host as it was before the install.

use std::path::{Path, PathBuf};

use hailo8_core::{InstallComponent, StageError, StageResult, find_package, package_version};
use tracing::{info, warn};

use super::install_deb;
use crate::installer::context::StageContext;
use crate::system::{module_loaded, pcie_device_visible, present_device_nodes};

/// File name prefix of the driver package.
pub const DRIVER_PACKAGE_PREFIX: &str = "hailort-pcie-driver_";

pub async fn install(ctx: &StageContext<'_>, component: &mut InstallComponent) -> StageResult<()> {
    let packages_dir = ctx.packages_dir();
    let package = find_package(&packages_dir, DRIVER_PACKAGE_PREFIX, ".deb").ok_or_else(|| {
        StageError::MissingPackage(format!(
            "{}/{DRIVER_PACKAGE_PREFIX}*.deb",
            packages_dir.display()
        ))
    })?;
    component.version = package_version(&package).unwrap_or_default();
    component.record("driver_package", package.display().to_string());

    snapshot_modules(ctx, component).await?;
    if !component.is_recorded("module_loaded_before") {
        let loaded_before = module_loaded(ctx.runner.as_ref(), ctx.driver_module()).await;
        component.record("module_loaded_before", loaded_before);
    }

    info!(package = %package.display(), "Installing PCIe driver package");
    install_deb(ctx, &package).await?;
    load_driver(ctx).await?;
    verify_driver(ctx).await
}

/// Save `lsmod` and `lspci` output to the backup directory.
async fn snapshot_modules(
    ctx: &StageContext<'_>,
    component: &mut InstallComponent,
) -> StageResult<()> {
    let backup_dir = ctx.layout.backup_dir();
    std::fs::create_dir_all(&backup_dir).map_err(|e| StageError::io(&backup_dir, e))?;

    for (argv, file, key) in [
        (["lsmod"].as_slice(), "lsmod_before_install.txt", "lsmod_snapshot"),
        (["lspci"].as_slice(), "lspci_before_install.txt", "lspci_snapshot"),
    ] {
        if component.is_recorded(key) {
            continue;
        }
        let out = ctx.run(argv).await;
        if !out.success() {
            warn!(command = argv[0], "Snapshot command failed, continuing");
            continue;
        }
        let path = backup_dir.join(file);
        std::fs::write(&path, &out.stdout).map_err(|e| StageError::io(&path, e))?;
        component.record(key, path.display().to_string());
    }
    Ok(())
}

/// Module file locations tried when `modprobe` fails.
fn module_fallback_paths(kernel_release: &str, module: &str) -> [PathBuf; 2] {
    let base = Path::new("/lib/modules").join(kernel_release);
    [
        base.join("extra").join(format!("{module}.ko")),
        base.join("kernel/drivers/misc").join(format!("{module}.ko")),
    ]
}

/// Load the kernel module: `modprobe`, then `insmod` on known paths.
pub async fn load_driver(ctx: &StageContext<'_>) -> StageResult<()> {
    let module = ctx.driver_module();
    let out = ctx.run(&["modprobe", module]).await;
    if out.success() {
        info!(module, "Kernel module loaded");
        return Ok(());
    }

    for candidate in module_fallback_paths(&ctx.system.kernel_release, module) {
        if !candidate.exists() {
            continue;
        }
        let path = candidate.to_string_lossy();
        if ctx.run(&["insmod", &path]).await.success() {
            info!(module, path = %path, "Kernel module loaded with insmod");
            return Ok(());
        }
    }

    Err(StageError::command(
        format!("modprobe {module}"),
        out.failure_reason(),
    ))
}

/// The module is loaded and the device is reachable through a node or the bus.
pub async fn verify_driver(ctx: &StageContext<'_>) -> StageResult<()> {
    let runner = ctx.runner.as_ref();
    if !module_loaded(runner, ctx.driver_module()).await {
        return Err(StageError::verification(format!(
            "kernel module {} is not loaded",
            ctx.driver_module()
        )));
    }

    let nodes = present_device_nodes(&ctx.config.hailo);
    if let Some(node) = nodes.first() {
        info!(node = %node.display(), "Device node present");
        return Ok(());
    }
    if pcie_device_visible(runner, &ctx.config.hailo.pcie_vendor_id).await {
        info!("Device visible on the PCIe bus");
        return Ok(());
    }
    Err(StageError::verification(
        "no device node and no Hailo device on the PCIe bus",
    ))
}
