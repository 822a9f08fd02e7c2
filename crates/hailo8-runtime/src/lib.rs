//! Host-facing side of the Hailo8 installer.
//!
//! Everything here talks to the operating system through the
//! [`CommandRunner`](hailo8_core::CommandRunner) port, except the few
//! direct filesystem and syscall helpers (state file, lock, disk space).

#![deny(unsafe_code)]

pub mod docker;
pub mod installer;
pub mod logging;
pub mod process;
pub mod state;
pub mod system;
pub mod validation;

// Re-export the production command runner
pub use process::ProcessCommandRunner;

// Re-export the pipeline entry points
pub use installer::{Installer, RepairStrategy, RollbackSummary};

// Re-export the standalone tools
pub use docker::{CleanupSummary, DockerError, DockerManager, DockerPresence, DockerSetupReport};
pub use validation::{CheckOutcome, CheckResult, ValidationReport, ValidationTester};

pub use logging::{LoggingGuard, init_logging};
pub use state::{StateLock, StateStore};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
