//! HailoRT runtime library and Python binding.

use hailo8_core::{InstallComponent, StageError, StageResult, find_package, package_version};
use tracing::{info, warn};

use super::install_deb;
use crate::installer::context::StageContext;
use crate::system::{command_exists, python_binding_importable};

pub const RUNTIME_PACKAGE_PREFIX: &str = "hailort_";
pub const PYTHON_WHEEL_PREFIX: &str = "hailort-";

pub async fn install(ctx: &StageContext<'_>, component: &mut InstallComponent) -> StageResult<()> {
    let packages_dir = ctx.packages_dir();

    if let Some(deb) = find_package(&packages_dir, RUNTIME_PACKAGE_PREFIX, ".deb") {
        info!(package = %deb.display(), "Installing HailoRT package");
        install_deb(ctx, &deb).await?;
        component.version = package_version(&deb).unwrap_or_default();
        component.record("runtime_package", deb.display().to_string());
    } else {
        info!("No HailoRT .deb package found, skipping");
    }

    if let Some(wheel) = find_package(&packages_dir, PYTHON_WHEEL_PREFIX, ".whl") {
        info!(wheel = %wheel.display(), "Installing HailoRT Python wheel");
        ctx.require_with_timeout(
            &["pip3", "install", &wheel.to_string_lossy()],
            ctx.package_timeout(),
        )
        .await?;
        if component.version.is_empty() {
            component.version = package_version(&wheel).unwrap_or_default();
        }
        component.record("python_wheel", wheel.display().to_string());
    } else {
        info!("No HailoRT Python wheel found, skipping");
    }

    verify(ctx).await
}

/// The Python binding must import; the CLI is informational.
pub async fn verify(ctx: &StageContext<'_>) -> StageResult<()> {
    let runner = ctx.runner.as_ref();
    if command_exists(runner, "hailortcli").await {
        info!("hailortcli available");
    } else {
        warn!("hailortcli not found on PATH");
    }

    if python_binding_importable(runner).await {
        info!("hailo_platform Python module imports");
        Ok(())
    } else {
        Err(StageError::verification(
            "hailo_platform Python module cannot be imported",
        ))
    }
}
