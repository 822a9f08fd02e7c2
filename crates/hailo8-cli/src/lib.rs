//! The `hailo8` command-line interface.
//!
//! `main.rs` parses arguments, bootstraps a [`CliContext`] and dispatches
//! to [`handlers`]. Everything else lives here so it can be tested.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;

// Dependencies used only by the binary
use dotenvy as _;
use tokio as _;
use tracing as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap, log_file_for};
pub use commands::{Commands, DockerArgs, DockerMode};
pub use error::CliError;
pub use parser::Cli;
