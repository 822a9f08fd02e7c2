//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;
use hailo8_core::settings::INSTALL_DIR_ENV;

use crate::commands::Commands;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "HAILO8_CONFIG";

/// Command-line interface for the Hailo8 installer.
///
/// Running without a subcommand performs `install`.
#[derive(Parser)]
#[command(name = "hailo8")]
#[command(about = "Install, validate and roll back the Hailo-8 accelerator stack")]
#[command(version)]
pub struct Cli {
    /// Root directory for state, logs and backups
    #[arg(long = "install-dir", env = INSTALL_DIR_ENV, global = true)]
    pub install_dir: Option<PathBuf>,

    /// YAML or JSON configuration file
    #[arg(long = "config", env = CONFIG_ENV, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand to run, defaulting to `install`.
    pub fn resolved_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Install)
    }
}
