//! Subcommands of the `hailo8` binary.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the installation pipeline, resuming where a previous run stopped
    Install,

    /// Show the persisted status of every component
    Status {
        /// Print the raw state document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Undo host changes and reset every component to pending
    Rollback,

    /// Set up, test or clean up the Docker runtime image
    Docker(DockerArgs),

    /// Run the validation checks
    Test {
        /// Skip the concurrent stress probe
        #[arg(long)]
        quick: bool,
        /// Report file (default: hailo8_test_report.txt)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print detected system and accelerator information
    Probe,
}

/// Options for `hailo8 docker`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DockerArgs {
    /// Directory holding the HailoRT packages for the image build
    #[arg(long = "packages-dir")]
    pub packages_dir: Option<PathBuf>,

    /// Stop and remove containers and the image
    #[arg(long, conflicts_with_all = ["test_only", "build_only"])]
    pub cleanup: bool,

    /// Only run the container smoke test
    #[arg(long = "test-only", conflicts_with = "build_only")]
    pub test_only: bool,

    /// Only build the image
    #[arg(long = "build-only")]
    pub build_only: bool,
}

/// What `hailo8 docker` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerMode {
    Full,
    BuildOnly,
    TestOnly,
    Cleanup,
}

impl DockerArgs {
    pub fn mode(&self) -> DockerMode {
        if self.cleanup {
            DockerMode::Cleanup
        } else if self.test_only {
            DockerMode::TestOnly
        } else if self.build_only {
            DockerMode::BuildOnly
        } else {
            DockerMode::Full
        }
    }
}
