//! Error types for the installation pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{ComponentType, InstallStatus};

/// A status change the pipeline refuses to make.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot start {requested}: {running} is already running")]
    AlreadyRunning {
        requested: ComponentType,
        running: ComponentType,
    },

    #[error("cannot start {requested}: {blocked_by} has not succeeded")]
    OutOfOrder {
        requested: ComponentType,
        blocked_by: ComponentType,
    },

    #[error("cannot recover {component}: status is {status}, expected failed")]
    NotFailed {
        component: ComponentType,
        status: InstallStatus,
    },
}

/// Errors that stop an installer operation outright.
///
/// Stage failures are not represented here; they are recorded on the
/// component and drive the retry/repair loop instead.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Another process holds the install lock.
    #[error("another installer instance is running against {0}")]
    Locked(PathBuf),

    /// The state file could not be written.
    #[error("failed to persist install state to {path}: {source}")]
    StatePersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for installer operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Why a single stage attempt failed.
#[derive(Debug, Error)]
pub enum StageError {
    /// A required command exited unsuccessfully.
    #[error("{command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// A package file the stage needs is not in the packages directory.
    #[error("package not found: {0}")]
    MissingPackage(String),

    /// The host does not meet a requirement.
    #[error("{0}")]
    Requirement(String),

    /// A Docker setup step failed.
    #[error("docker setup failed: {0}")]
    Docker(String),

    /// The stage ran but its post-condition check did not pass.
    #[error("verification failed: {0}")]
    Verification(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    pub fn command(command: impl ToString, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub fn requirement(msg: impl Into<String>) -> Self {
        Self::Requirement(msg.into())
    }

    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for stage attempts.
pub type StageResult<T> = Result<T, StageError>;
