//! System package prerequisites.
//!
//! Rollback data:
//! - `package_manager`: manager used for the install
//! - `packages_snapshot`: file holding the package list before install
//! - `installed_packages`: packages that were not present before
//!
//! The snapshot is taken on the first attempt; later attempts diff against
//! it so packages added by an earlier attempt still count as new.

use std::collections::BTreeSet;
use std::path::Path;

use hailo8_core::{InstallComponent, PackageManager, StageError, StageResult};
use tracing::{debug, info, warn};

use crate::installer::context::StageContext;

/// File in the backup directory holding the pre-install package list.
pub const PACKAGES_SNAPSHOT_FILE: &str = "packages_before_install.txt";

/// Names of every installed package, or `None` when the query fails.
pub async fn installed_packages(
    ctx: &StageContext<'_>,
    pm: PackageManager,
) -> Option<BTreeSet<String>> {
    let argv: &[&str] = if pm.is_debian_family() {
        &["dpkg-query", "-W", "-f=${Package}\\n"]
    } else {
        &["rpm", "-qa", "--qf", "%{NAME}\\n"]
    };
    let out = ctx.run(argv).await;
    if !out.success() {
        debug!(package_manager = %pm, "Package list query failed");
        return None;
    }
    Some(
        out.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn read_snapshot(path: &Path) -> Option<BTreeSet<String>> {
    match std::fs::read_to_string(path) {
        Ok(listing) => Some(
            listing
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Package snapshot unreadable, new packages will not be tracked");
            None
        }
    }
}

pub async fn install(ctx: &StageContext<'_>, component: &mut InstallComponent) -> StageResult<()> {
    let pm = ctx.system.package_manager.ok_or_else(|| {
        StageError::requirement("no supported package manager found (apt, yum, dnf)")
    })?;
    info!(package_manager = %pm, "Installing system dependencies");
    component.record("package_manager", pm.command());

    let before = match component.recorded_str("packages_snapshot") {
        Some(snapshot) => read_snapshot(Path::new(snapshot)),
        None => {
            let before = installed_packages(ctx, pm).await;
            if let Some(before) = &before {
                let path = ctx.layout.backup_dir().join(PACKAGES_SNAPSHOT_FILE);
                let listing: String = before.iter().map(|p| format!("{p}\n")).collect();
                std::fs::create_dir_all(ctx.layout.backup_dir())
                    .and_then(|()| std::fs::write(&path, listing))
                    .map_err(|e| StageError::io(&path, e))?;
                component.record("packages_snapshot", path.display().to_string());
            }
            before
        }
    };

    let timeout = ctx.package_timeout();
    if pm.is_debian_family() {
        ctx.require_with_timeout(&["apt", "update"], timeout).await?;
    }

    let wanted = pm.dependency_packages(&ctx.system.kernel_release);
    let mut failed = Vec::new();
    for package in &wanted {
        let out = ctx
            .run_with_timeout(&[pm.command(), "install", "-y", package], timeout)
            .await;
        if out.success() {
            debug!(package = %package, "Installed package");
        } else {
            warn!(package = %package, reason = %out.failure_reason(), "Package install failed, continuing");
            failed.push(package.clone());
        }
    }

    if let (Some(before), Some(after)) = (before, installed_packages(ctx, pm).await) {
        let added: Vec<String> = after.difference(&before).cloned().collect();
        info!(count = added.len(), "New packages installed");
        component.record("installed_packages", added);
    }

    if failed.is_empty() {
        info!("All dependencies installed");
    } else {
        warn!(failed = ?failed, "Some dependencies could not be installed");
    }
    Ok(())
}
