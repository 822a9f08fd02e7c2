//! Install functions, one module per component.
//!
//! Each stage takes the shared [`StageContext`] plus its own
//! [`InstallComponent`] (for `version` and `rollback_data`) and either
//! succeeds or returns the [`StageError`] recorded as the component's
//! `error_msg`.

pub mod dependencies;
pub mod docker_config;
pub mod hailort;
pub mod pcie_driver;
pub mod system_check;
pub mod validation;

use std::path::Path;

use hailo8_core::{ComponentType, InstallComponent, StageResult};
use tracing::warn;

use super::context::StageContext;

/// Run the install function for `component`.
pub async fn install(
    component: ComponentType,
    ctx: &StageContext<'_>,
    entry: &mut InstallComponent,
) -> StageResult<()> {
    match component {
        ComponentType::SystemCheck => system_check::install(ctx, entry).await,
        ComponentType::Dependencies => dependencies::install(ctx, entry).await,
        ComponentType::PcieDriver => pcie_driver::install(ctx, entry).await,
        ComponentType::HailoRT => hailort::install(ctx, entry).await,
        ComponentType::DockerConfig => docker_config::install(ctx, entry).await,
        ComponentType::Validation => validation::install(ctx, entry).await,
    }
}

/// `dpkg -i` a package, fixing missing dependencies and retrying once.
pub async fn install_deb(ctx: &StageContext<'_>, package: &Path) -> StageResult<()> {
    let package = package.to_string_lossy();
    let timeout = ctx.package_timeout();

    let first = ctx
        .run_with_timeout(&["dpkg", "-i", &package], timeout)
        .await;
    if first.success() {
        return Ok(());
    }

    warn!(package = %package, reason = %first.failure_reason(), "dpkg install failed, fixing dependencies");
    let fix = ctx
        .run_with_timeout(&["apt", "-f", "install", "-y"], timeout)
        .await;
    if !fix.success() {
        warn!(reason = %fix.failure_reason(), "apt -f install failed");
    }

    ctx.require_with_timeout(&["dpkg", "-i", &package], timeout)
        .await
        .map(|_| ())
}
