//! Command handlers.
//!
//! Each handler returns `Ok(true)` when the command achieved its goal and
//! `Ok(false)` when it ran but the outcome was a failure (exit code 1).

pub mod docker;
pub mod install;
pub mod probe;
pub mod rollback;
pub mod status;
pub mod validate;
