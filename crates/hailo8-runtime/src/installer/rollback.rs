//! Best-effort revert of host changes made by an install.

use std::path::Path;

use hailo8_core::ports::{CommandRunner, CommandSpec};
use hailo8_core::{ComponentType, InstallerConfig, PipelineState};
use tracing::{info, warn};

/// Outcome of a rollback pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollbackSummary {
    pub attempted: usize,
    pub failed: usize,
}

impl RollbackSummary {
    pub const fn clean(&self) -> bool {
        self.failed == 0
    }
}

/// Undo what the recorded state says was installed. Every step is
/// attempted regardless of earlier failures.
///
/// A driver module that was loaded before the install stays loaded. The
/// daemon config backup is moved back into place, so a later install
/// backs up the restored file afresh.
pub async fn revert_host(
    runner: &dyn CommandRunner,
    config: &InstallerConfig,
    state: &PipelineState,
) -> RollbackSummary {
    let mut steps: Vec<Vec<String>> = vec![argv(&["systemctl", "stop", "docker"])];
    let driver = state.component(ComponentType::PcieDriver);
    if driver.recorded_bool("module_loaded_before") == Some(true) {
        info!(module = %config.hailo.driver_module, "Module was loaded before install, leaving it loaded");
    } else {
        steps.push(argv(&["rmmod", &config.hailo.driver_module]));
    }
    steps.extend([
        argv(&["dpkg", "-r", "hailort"]),
        argv(&["dpkg", "-r", "hailort-pcie-driver"]),
        argv(&["pip3", "uninstall", "-y", "hailort"]),
    ]);

    let deps = state.component(ComponentType::Dependencies);
    let added = deps.recorded_list("installed_packages");
    if let Some(pm) = deps.recorded_str("package_manager").filter(|_| !added.is_empty()) {
        let mut remove = argv(&[pm, "remove", "-y"]);
        remove.extend(added);
        steps.push(remove);
    }

    let timeout = config.timeouts.package();
    let mut summary = RollbackSummary::default();
    for step in steps {
        summary.attempted += 1;
        let spec = CommandSpec::new(&step[0]).args(&step[1..]).timeout(timeout);
        let out = runner.run(&spec).await;
        if !out.success() {
            summary.failed += 1;
            warn!(command = %spec, reason = %out.failure_reason(), "Rollback step failed, continuing");
        }
    }

    let docker = state.component(ComponentType::DockerConfig);
    let target = &config.docker.daemon_config_path;
    if let Some(backup) = docker.recorded_str("daemon_config_backup") {
        summary.attempted += 1;
        if let Err(e) = restore_file(Path::new(backup), target) {
            summary.failed += 1;
            warn!(backup, target = %target.display(), error = %e, "Failed to restore daemon config");
        } else {
            info!(target = %target.display(), "Restored daemon config");
        }
    } else if docker.recorded_bool("daemon_config_created") == Some(true) {
        summary.attempted += 1;
        match std::fs::remove_file(target) {
            Ok(()) => info!(target = %target.display(), "Removed generated daemon config"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                summary.failed += 1;
                warn!(target = %target.display(), error = %e, "Failed to remove daemon config");
            }
        }
    }

    info!(
        attempted = summary.attempted,
        failed = summary.failed,
        "Host rollback finished"
    );
    summary
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

fn restore_file(backup: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::rename(backup, target)
}
