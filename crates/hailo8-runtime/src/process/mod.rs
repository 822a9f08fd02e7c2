//! Child process execution.

mod runner;
mod shutdown;

pub use runner::ProcessCommandRunner;
pub use shutdown::{TERMINATION_GRACE, terminate_group};
