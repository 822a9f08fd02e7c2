//! Shared inputs handed to every stage and repair.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hailo8_core::ports::{CommandOutput, CommandRunner, CommandSpec};
use hailo8_core::{
    HardwareAvailability, InstallLayout, InstallerConfig, StageError, StageResult, SystemInfo,
};

/// Everything a stage may read. Stages write only to their own component.
pub struct StageContext<'a> {
    pub runner: Arc<dyn CommandRunner>,
    pub config: &'a InstallerConfig,
    pub layout: &'a InstallLayout,
    pub system: &'a SystemInfo,
    pub hardware: &'a HardwareAvailability,
}

impl StageContext<'_> {
    /// Run a command with the default timeout.
    pub async fn run(&self, argv: &[&str]) -> CommandOutput {
        self.run_with_timeout(argv, self.config.timeouts.default_timeout())
            .await
    }

    pub async fn run_with_timeout(&self, argv: &[&str], timeout: Duration) -> CommandOutput {
        self.runner
            .run(&CommandSpec::from_argv(argv).timeout(timeout))
            .await
    }

    /// Run a command that must succeed.
    pub async fn require(&self, argv: &[&str]) -> StageResult<CommandOutput> {
        self.require_with_timeout(argv, self.config.timeouts.default_timeout())
            .await
    }

    pub async fn require_with_timeout(
        &self,
        argv: &[&str],
        timeout: Duration,
    ) -> StageResult<CommandOutput> {
        let out = self.run_with_timeout(argv, timeout).await;
        if out.success() {
            Ok(out)
        } else {
            Err(StageError::command(argv.join(" "), out.failure_reason()))
        }
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.config.packages_dir()
    }

    pub fn driver_module(&self) -> &str {
        &self.config.hailo.driver_module
    }

    pub fn package_timeout(&self) -> Duration {
        self.config.timeouts.package()
    }
}
