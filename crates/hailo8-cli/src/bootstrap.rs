//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Installer configuration (config file, then flag/env overrides)
//! - Command runner (via hailo8-runtime)
//!
//! Command handlers receive the composed [`CliContext`].

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hailo8_core::paths::{DOCKER_LOG_FILE_NAME, TEST_LOG_FILE_NAME};
use hailo8_core::ports::CommandRunner;
use hailo8_core::{InstallLayout, InstallerConfig, validate_config};
use hailo8_runtime::{Installer, ProcessCommandRunner};

use crate::commands::Commands;
use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Config file to load, if any.
    pub config_path: Option<PathBuf>,
    /// Install directory override from `--install-dir` or the environment.
    pub install_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Load the config file (or defaults) and apply overrides.
    pub fn resolve(&self) -> Result<InstallerConfig, CliError> {
        let mut config = match &self.config_path {
            Some(path) => InstallerConfig::load(path)?,
            None => InstallerConfig::default(),
        };
        if let Some(dir) = &self.install_dir {
            config.install_dir.clone_from(dir);
        }
        validate_config(&config)?;
        Ok(config)
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// Effective installer configuration.
    pub config: InstallerConfig,
    /// Runner every host command goes through.
    pub runner: Arc<dyn CommandRunner>,
}

impl CliContext {
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Create an installer over the configured install directory.
    pub fn installer(&self) -> Result<Installer, CliError> {
        Ok(Installer::new(self.runner.clone(), self.config.clone())?)
    }
}

/// Bootstrap the CLI application with the real process runner.
pub fn bootstrap(config: &CliConfig) -> Result<CliContext, CliError> {
    Ok(CliContext {
        config: config.resolve()?,
        runner: Arc::new(ProcessCommandRunner::new()),
    })
}

/// Log file for `command`, if it writes one.
///
/// Pipeline commands get a fresh file under `<install_dir>/logs`; the
/// docker and test tools append to a file in the working directory.
pub fn log_file_for(
    command: &Commands,
    config: &InstallerConfig,
    now: DateTime<Utc>,
) -> Option<PathBuf> {
    match command {
        Commands::Install | Commands::Rollback => Some(
            InstallLayout::new(&config.install_dir)
                .logs_dir()
                .join(InstallLayout::install_log_file_name(now.timestamp())),
        ),
        Commands::Docker(_) => Some(PathBuf::from(DOCKER_LOG_FILE_NAME)),
        Commands::Test { .. } => Some(PathBuf::from(TEST_LOG_FILE_NAME)),
        Commands::Status { .. } | Commands::Probe => None,
    }
}
