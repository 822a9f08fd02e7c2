//! CLI-specific error types and mappings.
//!
//! Library errors are converted into [`CliError`] at the handler boundary
//! so `main` can pick an exit code.

use hailo8_core::{InstallError, SettingsError};
use hailo8_runtime::DockerError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Pipeline error (state persistence, transitions).
    #[error("{0}")]
    Install(String),

    /// Another installer instance holds the lock.
    #[error("{0}")]
    Locked(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Docker setup error.
    #[error("Docker error: {0}")]
    Docker(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error, also used when a pipeline or check fails
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Install(_) => 1,
            CliError::Docker(_) => 1,
            CliError::Locked(_) => 75, // EX_TEMPFAIL
            CliError::Io(_) => 74,     // EX_IOERR
            CliError::Config(_) => 78, // EX_CONFIG
        }
    }
}

impl From<InstallError> for CliError {
    fn from(err: InstallError) -> Self {
        match err {
            InstallError::Locked(_) => CliError::Locked(err.to_string()),
            InstallError::StatePersist { .. } | InstallError::Io { .. } => {
                CliError::Io(err.to_string())
            }
            InstallError::Serialize(_) | InstallError::Transition(_) => {
                CliError::Install(err.to_string())
            }
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<DockerError> for CliError {
    fn from(err: DockerError) -> Self {
        CliError::Docker(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_lock_contention_exit_code() {
        let err = CliError::from(InstallError::Locked(PathBuf::from("/opt/hailo8/install_state.lock")));
        assert_eq!(err.exit_code(), 75);
        assert!(err.to_string().contains("another installer instance"));
    }

    #[test]
    fn test_config_error_exit_code() {
        let err = CliError::from(SettingsError::ZeroRetries);
        assert_eq!(err.exit_code(), 78);
        assert_eq!(err.to_string(), "Configuration error: max_retries must be at least 1");
    }
}
