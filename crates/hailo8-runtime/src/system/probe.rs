//! Host detection: OS, kernel, distribution and package manager.

use std::collections::HashMap;
use std::time::Duration;

use hailo8_core::ports::{CommandRunner, CommandSpec};
use hailo8_core::{DistroFamily, PackageManager, SystemInfo};
use tracing::{debug, info};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Parse `/etc/os-release` into a key → value map with quotes stripped.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| {
            (
                k.trim().to_string(),
                v.trim().trim_matches('"').trim_matches('\'').to_string(),
            )
        })
        .collect()
}

async fn first_line(runner: &dyn CommandRunner, argv: &[&str]) -> Option<String> {
    let out = runner
        .run(&CommandSpec::from_argv(argv).timeout(PROBE_TIMEOUT))
        .await;
    if !out.success() {
        return None;
    }
    out.stdout
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

/// True when `program` resolves on `PATH`.
pub async fn command_exists(runner: &dyn CommandRunner, program: &str) -> bool {
    runner
        .run(&CommandSpec::from_argv(&["which", program]).timeout(PROBE_TIMEOUT))
        .await
        .success()
}

/// First package manager found in apt → yum → dnf order.
pub async fn detect_package_manager(runner: &dyn CommandRunner) -> Option<PackageManager> {
    for pm in PackageManager::PROBE_ORDER {
        if command_exists(runner, pm.command()).await {
            debug!(package_manager = %pm, "Detected package manager");
            return Some(pm);
        }
    }
    None
}

/// Probe the host. Missing facts are reported as `"unknown"`.
pub async fn detect_system_info(runner: &dyn CommandRunner) -> SystemInfo {
    let release = runner
        .run(&CommandSpec::from_argv(&["cat", "/etc/os-release"]).timeout(PROBE_TIMEOUT))
        .await;
    let os_release = if release.success() {
        parse_os_release(&release.stdout)
    } else {
        HashMap::new()
    };

    let field = |key: &str| os_release.get(key).cloned().unwrap_or_default();
    let distro_id = {
        let id = field("ID").to_lowercase();
        if id.is_empty() { "unknown".to_string() } else { id }
    };
    let id_like: Vec<String> = field("ID_LIKE")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let unknown = || "unknown".to_string();
    let info = SystemInfo {
        os: first_line(runner, &["uname", "-s"]).await.unwrap_or_else(unknown),
        kernel_release: first_line(runner, &["uname", "-r"]).await.unwrap_or_else(unknown),
        arch: first_line(runner, &["uname", "-m"]).await.unwrap_or_else(unknown),
        distro_family: DistroFamily::classify(&distro_id, &id_like),
        distro_version: field("VERSION_ID"),
        distro_pretty_name: field("PRETTY_NAME"),
        distro_id,
        package_manager: detect_package_manager(runner).await,
    };

    info!(
        distro = %info.distro_id,
        version = %info.distro_version,
        kernel = %info.kernel_release,
        arch = %info.arch,
        package_manager = ?info.package_manager,
        "Detected system"
    );
    info
}
