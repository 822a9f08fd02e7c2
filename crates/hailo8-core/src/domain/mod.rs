//! Domain types for the installation pipeline.
//!
//! These are pure data structures with no I/O. Persistence lives in the
//! runtime crate's state store.

mod component;
mod state;
mod system;

pub use component::{
    ComponentType, DEFAULT_MAX_RETRIES, InstallComponent, InstallStatus, RollbackData,
};
pub use state::{InstallStateDocument, PipelineState};
pub use system::{
    DistroFamily, HardwareAvailability, PackageManager, SUPPORTED_ARCHES, SUPPORTED_DISTROS,
    SystemInfo, parse_kernel_major,
};
