//! Component-specific repair, tried once after the retry budget is spent.

use std::fmt;

use hailo8_core::{ComponentType, InstallComponent, StageError, StageResult};
use tracing::{info, warn};

use super::context::StageContext;
use super::stages::{self, pcie_driver};

/// Corrective action for a failed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    /// Refresh package metadata and reinstall base tools, then re-check.
    RefreshSystemTools,
    /// Repair the package database, then re-run the dependency install.
    FixBrokenPackages,
    /// Rebuild DKMS modules, then load and verify the driver.
    RebuildKernelModule,
    /// Reinstall the runtime package and Python binding.
    ReinstallRuntime,
    /// Restart the Docker service, then re-run Docker setup.
    RestartDockerService,
    /// Reload the kernel module, then re-run validation.
    ReloadDriver,
}

impl RepairStrategy {
    pub const fn for_component(component: ComponentType) -> Self {
        match component {
            ComponentType::SystemCheck => Self::RefreshSystemTools,
            ComponentType::Dependencies => Self::FixBrokenPackages,
            ComponentType::PcieDriver => Self::RebuildKernelModule,
            ComponentType::HailoRT => Self::ReinstallRuntime,
            ComponentType::DockerConfig => Self::RestartDockerService,
            ComponentType::Validation => Self::ReloadDriver,
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Self::RefreshSystemTools => "refresh system tools",
            Self::FixBrokenPackages => "fix broken packages",
            Self::RebuildKernelModule => "rebuild kernel module",
            Self::ReinstallRuntime => "reinstall runtime",
            Self::RestartDockerService => "restart docker service",
            Self::ReloadDriver => "reload driver",
        }
    }

    /// Run the corrective commands and one more attempt or verification.
    pub async fn attempt(
        self,
        ctx: &StageContext<'_>,
        entry: &mut InstallComponent,
    ) -> StageResult<()> {
        info!(strategy = self.describe(), component = %entry.component_type, "Attempting repair");
        match self {
            Self::RefreshSystemTools => {
                let pm = package_manager(ctx)?;
                let timeout = ctx.package_timeout();
                if pm.is_debian_family() {
                    ctx.require_with_timeout(&["apt", "update"], timeout).await?;
                    ctx.require_with_timeout(
                        &["apt", "install", "-y", "lsb-release", "pciutils"],
                        timeout,
                    )
                    .await?;
                } else {
                    ctx.require_with_timeout(&[pm.command(), "install", "-y", "pciutils"], timeout)
                        .await?;
                }
                stages::system_check::install(ctx, entry).await
            }
            Self::FixBrokenPackages => {
                let pm = package_manager(ctx)?;
                let timeout = ctx.package_timeout();
                if pm.is_debian_family() {
                    ctx.require_with_timeout(&["apt", "--fix-broken", "install", "-y"], timeout)
                        .await?;
                    ctx.require_with_timeout(&["dpkg", "--configure", "-a"], timeout)
                        .await?;
                } else {
                    ctx.require_with_timeout(&[pm.command(), "clean", "all"], timeout)
                        .await?;
                    ctx.require_with_timeout(&[pm.command(), "makecache"], timeout)
                        .await?;
                }
                stages::dependencies::install(ctx, entry).await
            }
            Self::RebuildKernelModule => {
                ctx.require_with_timeout(&["dkms", "autoinstall"], ctx.package_timeout())
                    .await?;
                pcie_driver::load_driver(ctx).await?;
                pcie_driver::verify_driver(ctx).await
            }
            Self::ReinstallRuntime => stages::hailort::install(ctx, entry).await,
            Self::RestartDockerService => {
                let out = ctx.run(&["systemctl", "restart", "docker"]).await;
                if !out.success() {
                    warn!(reason = %out.failure_reason(), "Docker restart failed, retrying setup anyway");
                }
                stages::docker_config::install(ctx, entry).await
            }
            Self::ReloadDriver => {
                let out = ctx.run(&["rmmod", ctx.driver_module()]).await;
                if !out.success() {
                    warn!(reason = %out.failure_reason(), "rmmod failed, loading anyway");
                }
                pcie_driver::load_driver(ctx).await?;
                stages::validation::install(ctx, entry).await
            }
        }
    }
}

impl fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

fn package_manager(ctx: &StageContext<'_>) -> StageResult<hailo8_core::PackageManager> {
    ctx.system
        .package_manager
        .ok_or_else(|| StageError::requirement("no supported package manager found (apt, yum, dnf)"))
}
