//! Core domain types and port definitions for the Hailo8 installer.
//!
//! This crate is pure: it owns the component/state model, the
//! [`CommandRunner`] port every host interaction goes through, the
//! installer configuration and the install-directory layout. Adapters that
//! touch the operating system live in `hailo8-runtime`.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod paths;
pub mod ports;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    ComponentType, DistroFamily, HardwareAvailability, InstallComponent, InstallStateDocument,
    InstallStatus, PackageManager, PipelineState, RollbackData, SystemInfo,
};
pub use error::{InstallError, InstallResult, StageError, StageResult, TransitionError};
pub use paths::{InstallLayout, find_package, package_version};
pub use ports::{CommandOutput, CommandRunner, CommandSpec, CommandStatus};
pub use settings::{
    DockerSettings, HailoSettings, InstallerConfig, SettingsError, TimeoutSettings,
    validate_config,
};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
