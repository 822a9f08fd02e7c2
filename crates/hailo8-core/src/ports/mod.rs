//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.

pub mod command_runner;

pub use command_runner::{
    CommandOutput, CommandRunner, CommandSpec, CommandStatus, DEFAULT_COMMAND_TIMEOUT,
};
