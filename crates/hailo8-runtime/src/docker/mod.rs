//! Docker engine setup, runtime image build and container smoke test.
//!
//! The four setup steps are strictly ordered; each one requires the
//! previous to have succeeded:
//! 1. [`DockerManager::ensure_docker`]: engine installed and service running
//! 2. [`DockerManager::configure_daemon`]: daemon config with device runtime
//! 3. [`DockerManager::build_image`]: runtime image from the packages dir
//! 4. [`DockerManager::test_container`]: image runs with the device mapped

mod dockerfile;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hailo8_core::ports::{CommandOutput, CommandRunner, CommandSpec};
use hailo8_core::{DistroFamily, DockerSettings, HailoSettings, InstallerConfig, TimeoutSettings};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use dockerfile::{IMAGE_TEST_SCRIPT, render_dockerfile};

use crate::system::present_device_nodes;

const DOCKER_PACKAGES: [&str; 5] = [
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
    "docker-compose-plugin",
];

/// Errors from Docker setup steps.
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("Docker cannot be installed automatically on this distribution")]
    UnsupportedDistro,

    #[error("`{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Docker daemon config {path}: {source}")]
    DaemonConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("packages directory {0} does not exist")]
    MissingPackages(PathBuf),

    #[error("build context: {0}")]
    BuildContext(#[source] std::io::Error),
}

pub type DockerResult<T> = Result<T, DockerError>;

/// Docker engine state on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerPresence {
    Running,
    InstalledNotRunning,
    Missing,
}

/// What a full setup changed, for rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerSetupReport {
    pub installed_engine: bool,
    /// Copy of the daemon config that existed before it was replaced.
    pub daemon_config_backup: Option<PathBuf>,
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub attempted: usize,
    pub failed: usize,
}

/// Drives the `docker` CLI and the Docker service.
pub struct DockerManager {
    runner: Arc<dyn CommandRunner>,
    docker: DockerSettings,
    hailo: HailoSettings,
    timeouts: TimeoutSettings,
}

impl DockerManager {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &InstallerConfig) -> Self {
        Self {
            runner,
            docker: config.docker.clone(),
            hailo: config.hailo.clone(),
            timeouts: config.timeouts.clone(),
        }
    }

    pub fn image_name(&self) -> &str {
        &self.docker.image_name
    }

    async fn run(&self, argv: &[&str], timeout: Duration) -> CommandOutput {
        self.runner
            .run(&CommandSpec::from_argv(argv).timeout(timeout))
            .await
    }

    async fn require(&self, argv: &[&str], timeout: Duration) -> DockerResult<CommandOutput> {
        let out = self.run(argv, timeout).await;
        if out.success() {
            Ok(out)
        } else {
            Err(DockerError::Command {
                command: argv.join(" "),
                reason: out.failure_reason(),
            })
        }
    }

    /// Probe the engine: binary on `PATH`, then a round-trip to the daemon.
    pub async fn presence(&self) -> DockerPresence {
        if !self.run(&["which", "docker"], self.timeouts.quick()).await.success() {
            return DockerPresence::Missing;
        }
        if self
            .run(&["docker", "version"], self.timeouts.probe())
            .await
            .success()
        {
            DockerPresence::Running
        } else {
            DockerPresence::InstalledNotRunning
        }
    }

    /// Install and start Docker as needed. Returns whether the engine was
    /// installed by this call.
    pub async fn ensure_docker(&self, family: DistroFamily) -> DockerResult<bool> {
        match self.presence().await {
            DockerPresence::Running => {
                info!("Docker is installed and running");
                Ok(false)
            }
            DockerPresence::InstalledNotRunning => {
                info!("Docker is installed but the daemon is not responding, starting service");
                self.start_service().await?;
                Ok(false)
            }
            DockerPresence::Missing => {
                info!("Docker not found, installing");
                self.install_docker(family).await?;
                self.start_service().await?;
                Ok(true)
            }
        }
    }

    /// Distribution-specific engine install recipe.
    pub fn install_commands(family: DistroFamily) -> DockerResult<Vec<Vec<String>>> {
        let to_argv = |argv: &[&str]| argv.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        let with_packages = |prefix: &[&str]| {
            let mut argv = to_argv(prefix);
            argv.extend(DOCKER_PACKAGES.iter().map(|s| (*s).to_string()));
            argv
        };
        match family {
            DistroFamily::Debian => Ok(vec![
                to_argv(&["apt-get", "update"]),
                to_argv(&[
                    "apt-get",
                    "install",
                    "-y",
                    "ca-certificates",
                    "curl",
                    "gnupg",
                    "lsb-release",
                ]),
                to_argv(&["mkdir", "-p", "/etc/apt/keyrings"]),
                to_argv(&[
                    "curl",
                    "-fsSL",
                    "https://download.docker.com/linux/ubuntu/gpg",
                    "-o",
                    "/etc/apt/keyrings/docker.asc",
                ]),
                to_argv(&["chmod", "a+r", "/etc/apt/keyrings/docker.asc"]),
                to_argv(&["apt-get", "update"]),
                with_packages(&["apt-get", "install", "-y"]),
            ]),
            DistroFamily::RedHat => Ok(vec![
                to_argv(&["yum", "install", "-y", "yum-utils"]),
                to_argv(&[
                    "yum-config-manager",
                    "--add-repo",
                    "https://download.docker.com/linux/centos/docker-ce.repo",
                ]),
                with_packages(&["yum", "install", "-y"]),
            ]),
            DistroFamily::Other => Err(DockerError::UnsupportedDistro),
        }
    }

    /// Install the Docker engine packages.
    pub async fn install_docker(&self, family: DistroFamily) -> DockerResult<()> {
        for argv in Self::install_commands(family)? {
            let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
            self.require(&argv, self.timeouts.package()).await?;
        }
        info!("Docker engine installed");
        Ok(())
    }

    async fn start_service(&self) -> DockerResult<()> {
        let timeout = self.timeouts.default_timeout();
        self.require(&["systemctl", "start", "docker"], timeout)
            .await?;
        let enable = self.run(&["systemctl", "enable", "docker"], timeout).await;
        if !enable.success() {
            warn!(reason = %enable.failure_reason(), "Could not enable Docker at boot");
        }
        Ok(())
    }

    /// Back up the current daemon config, write ours and restart the daemon.
    ///
    /// Returns the backup path when a config existed before.
    pub async fn configure_daemon(&self) -> DockerResult<Option<PathBuf>> {
        let backup = self.backup_daemon_config()?;
        self.write_daemon_config().await?;
        Ok(backup)
    }

    /// Path the previous daemon config is kept at: `<path>.backup`.
    pub fn daemon_backup_path(&self) -> PathBuf {
        let mut backup = self.docker.daemon_config_path.clone().into_os_string();
        backup.push(".backup");
        PathBuf::from(backup)
    }

    /// Copy the current daemon config to [`daemon_backup_path`](Self::daemon_backup_path).
    ///
    /// An existing backup is never overwritten: it holds the config from
    /// before the first setup, while the live file may already be ours.
    /// Returns `None` when there is neither a config nor a backup.
    pub fn backup_daemon_config(&self) -> DockerResult<Option<PathBuf>> {
        let path = &self.docker.daemon_config_path;
        let backup = self.daemon_backup_path();
        if backup.exists() {
            info!(backup = %backup.display(), "Keeping existing daemon config backup");
            return Ok(Some(backup));
        }
        if !path.exists() {
            return Ok(None);
        }
        std::fs::copy(path, &backup).map_err(|source| DockerError::DaemonConfig {
            path: path.clone(),
            source,
        })?;
        info!(backup = %backup.display(), "Backed up existing daemon config");
        Ok(Some(backup))
    }

    /// Write the daemon config with the device runtime and restart the daemon.
    pub async fn write_daemon_config(&self) -> DockerResult<()> {
        let path = &self.docker.daemon_config_path;
        let config_error = |source| DockerError::DaemonConfig {
            path: path.clone(),
            source,
        };

        let mut config = self.docker.daemon_config.clone();
        if let Some(map) = config.as_object_mut() {
            map.entry("runtimes")
                .or_insert_with(|| serde_json::json!({}));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(config_error)?;
        }
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| config_error(std::io::Error::other(e)))?;
        std::fs::write(path, json).map_err(config_error)?;
        info!(path = %path.display(), "Wrote Docker daemon config");

        self.require(
            &["systemctl", "restart", "docker"],
            self.timeouts.default_timeout(),
        )
        .await?;
        Ok(())
    }

    /// Build the runtime image from a temporary context holding the
    /// generated Dockerfile and a copy of `packages_dir`.
    pub async fn build_image(&self, packages_dir: &Path) -> DockerResult<()> {
        if !packages_dir.is_dir() {
            return Err(DockerError::MissingPackages(packages_dir.to_path_buf()));
        }
        let context = tempfile::Builder::new()
            .prefix("hailo8-docker-")
            .tempdir()
            .map_err(DockerError::BuildContext)?;
        let staged = copy_packages(packages_dir, &context.path().join("packages"))
            .map_err(DockerError::BuildContext)?;
        debug!(files = staged, "Staged packages into build context");

        let dockerfile = context.path().join("Dockerfile");
        std::fs::write(&dockerfile, render_dockerfile(&self.docker.base_image))
            .map_err(DockerError::BuildContext)?;

        info!(image = %self.docker.image_name, "Building runtime image");
        let dockerfile = dockerfile.to_string_lossy();
        let context_dir = context.path().to_string_lossy();
        self.require(
            &[
                "docker",
                "build",
                "-t",
                &self.docker.image_name,
                "-f",
                &dockerfile,
                &context_dir,
            ],
            self.timeouts.image_build(),
        )
        .await?;
        info!(image = %self.docker.image_name, "Image built");
        Ok(())
    }

    /// `--device` arguments for every configured node that exists.
    pub fn device_args(&self) -> Vec<String> {
        present_device_nodes(&self.hailo)
            .into_iter()
            .flat_map(|node| {
                let node = node.display().to_string();
                ["--device".to_string(), format!("{node}:{node}")]
            })
            .collect()
    }

    /// Run the image's smoke test with the device nodes mapped in.
    pub async fn test_container(&self) -> DockerResult<String> {
        let devices = self.device_args();
        if devices.is_empty() {
            warn!("No device nodes present, running container without devices");
        }
        let mut argv = vec!["docker", "run", "--rm"];
        argv.extend(devices.iter().map(String::as_str));
        argv.extend([self.docker.image_name.as_str(), "python3", IMAGE_TEST_SCRIPT]);

        let out = self
            .require(&argv, self.timeouts.container_test())
            .await?;
        info!(output = %out.stdout.trim(), "Container smoke test passed");
        Ok(out.stdout)
    }

    /// Run all four steps in order, stopping at the first failure.
    pub async fn setup_complete_docker_environment(
        &self,
        family: DistroFamily,
        packages_dir: &Path,
    ) -> DockerResult<DockerSetupReport> {
        let installed_engine = self.ensure_docker(family).await?;
        let daemon_config_backup = self.configure_daemon().await?;
        self.build_image(packages_dir).await?;
        self.test_container().await?;
        info!("Docker environment ready");
        Ok(DockerSetupReport {
            installed_engine,
            daemon_config_backup,
        })
    }

    /// Stop and remove the configured containers and remove the image.
    /// Best effort: failures are counted and logged.
    pub async fn cleanup(&self) -> CleanupSummary {
        let timeout = self.timeouts.probe();
        let mut steps: Vec<Vec<&str>> = Vec::new();
        for name in &self.docker.container_names {
            steps.push(vec!["docker", "stop", name.as_str()]);
            steps.push(vec!["docker", "rm", name.as_str()]);
        }
        steps.push(vec!["docker", "rmi", self.docker.image_name.as_str()]);

        let mut summary = CleanupSummary::default();
        for argv in steps {
            summary.attempted += 1;
            let out = self.run(&argv, timeout).await;
            if !out.success() {
                summary.failed += 1;
                warn!(command = %argv.join(" "), reason = %out.failure_reason(), "Cleanup step failed");
            }
        }
        info!(
            attempted = summary.attempted,
            failed = summary.failed,
            "Docker cleanup finished"
        );
        summary
    }
}

/// Copy the regular files of `from` into `to`. Returns the file count.
fn copy_packages(from: &Path, to: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::copy(entry.path(), to.join(entry.file_name()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hailo8_core::testing::ScriptedRunner;

    fn config(dir: &Path) -> InstallerConfig {
        let mut config = InstallerConfig::default();
        config.docker.daemon_config_path = dir.join("docker").join("daemon.json");
        config.hailo.device_nodes = vec![dir.join("hailo0"), dir.join("hailo_pci")];
        config
    }

    fn manager(runner: &Arc<ScriptedRunner>, config: &InstallerConfig) -> DockerManager {
        DockerManager::new(runner.clone(), config)
    }

    #[tokio::test]
    async fn presence_distinguishes_daemon_down() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        let manager = manager(&runner, &config(dir.path()));
        assert_eq!(manager.presence().await, DockerPresence::Running);

        runner.on(&["docker", "version"], CommandOutput::failed("Cannot connect"));
        assert_eq!(manager.presence().await, DockerPresence::InstalledNotRunning);

        runner.on(&["which", "docker"], CommandOutput::failed(""));
        assert_eq!(manager.presence().await, DockerPresence::Missing);
    }

    #[tokio::test]
    async fn missing_docker_is_installed_then_started() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        runner.on(&["which", "docker"], CommandOutput::failed(""));
        let manager = manager(&runner, &config(dir.path()));

        assert!(manager.ensure_docker(DistroFamily::Debian).await.unwrap());
        let lines = runner.command_lines();
        let install = lines
            .iter()
            .position(|l| l.starts_with("apt-get install -y docker-ce"))
            .unwrap();
        let start = lines
            .iter()
            .position(|l| l == "systemctl start docker")
            .unwrap();
        assert!(install < start);
    }

    #[tokio::test]
    async fn unsupported_distro_cannot_install() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        runner.on(&["which", "docker"], CommandOutput::failed(""));
        let manager = manager(&runner, &config(dir.path()));
        assert!(matches!(
            manager.ensure_docker(DistroFamily::Other).await,
            Err(DockerError::UnsupportedDistro)
        ));
    }

    #[test]
    fn redhat_recipe_adds_repo() {
        let commands = DockerManager::install_commands(DistroFamily::RedHat).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[1][0], "yum-config-manager");
        assert!(commands[2].contains(&"containerd.io".to_string()));
    }

    #[tokio::test]
    async fn daemon_config_backs_up_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let path = &config.docker.daemon_config_path;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, r#"{"log-driver": "journald"}"#).unwrap();

        let runner = Arc::new(ScriptedRunner::succeeding());
        let backup = manager(&runner, &config)
            .configure_daemon()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&backup).unwrap(),
            r#"{"log-driver": "journald"}"#
        );
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["runtimes"]["hailo"]["path"], "/usr/bin/runc");
        assert_eq!(runner.count_matching(&["systemctl", "restart", "docker"]), 1);
    }

    #[tokio::test]
    async fn repeated_setup_keeps_original_backup() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let path = &config.docker.daemon_config_path;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, r#"{"log-driver": "journald"}"#).unwrap();

        let runner = Arc::new(ScriptedRunner::succeeding());
        let manager = manager(&runner, &config);
        let first = manager.configure_daemon().await.unwrap();
        let second = manager.configure_daemon().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            std::fs::read_to_string(second.unwrap()).unwrap(),
            r#"{"log-driver": "journald"}"#
        );
    }

    #[tokio::test]
    async fn no_previous_config_means_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        let manager = manager(&runner, &config(dir.path()));
        assert_eq!(manager.configure_daemon().await.unwrap(), None);
        assert!(!manager.daemon_backup_path().exists());
    }

    #[tokio::test]
    async fn daemon_restart_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        runner.on(&["systemctl", "restart"], CommandOutput::failed("Job failed"));
        let result = manager(&runner, &config(dir.path())).configure_daemon().await;
        assert!(matches!(result, Err(DockerError::Command { .. })));
    }

    #[tokio::test]
    async fn build_stages_packages_and_uses_long_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let packages = dir.path().join("packages");
        std::fs::create_dir_all(&packages).unwrap();
        std::fs::write(packages.join("hailort_4.23.0_amd64.deb"), b"deb").unwrap();

        let runner = Arc::new(ScriptedRunner::succeeding());
        manager(&runner, &config(dir.path()))
            .build_image(&packages)
            .await
            .unwrap();

        let build = runner
            .calls()
            .into_iter()
            .find(|c| c.args.first().map(String::as_str) == Some("build"))
            .unwrap();
        assert_eq!(build.timeout, Duration::from_secs(1800));
        assert_eq!(&build.args[..3], ["build", "-t", "hailo8:latest"]);
    }

    #[tokio::test]
    async fn build_requires_packages_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        let result = manager(&runner, &config(dir.path()))
            .build_image(&dir.path().join("missing"))
            .await;
        assert!(matches!(result, Err(DockerError::MissingPackages(_))));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn container_test_maps_only_existing_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(dir.path().join("hailo0"), "").unwrap();

        let runner = Arc::new(ScriptedRunner::succeeding());
        manager(&runner, &config).test_container().await.unwrap();

        let node = dir.path().join("hailo0").display().to_string();
        assert_eq!(
            runner.command_lines(),
            vec![format!(
                "docker run --rm --device {node}:{node} hailo8:latest python3 /opt/hailo/test.py"
            )]
        );
    }

    #[tokio::test]
    async fn failed_engine_install_skips_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        runner
            .on(&["which", "docker"], CommandOutput::failed(""))
            .on(&["apt-get", "install"], CommandOutput::failed("E: broken"));

        let result = manager(&runner, &config(dir.path()))
            .setup_complete_docker_environment(DistroFamily::Debian, dir.path())
            .await;
        assert!(result.is_err());
        assert_eq!(runner.count_matching(&["docker", "build"]), 0);
        assert_eq!(runner.count_matching(&["systemctl", "restart"]), 0);
    }

    #[tokio::test]
    async fn cleanup_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        runner.on(&["docker", "stop"], CommandOutput::failed("No such container"));
        let summary = manager(&runner, &config(dir.path())).cleanup().await;
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(runner.count_matching(&["docker", "rmi", "hailo8:latest"]), 1);
    }
}
