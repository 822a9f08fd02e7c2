//! Tracing setup shared by every `hailo8` command.
//!
//! Logs are written to:
//! - stdout (for console viewing)
//! - a plain-text log file (no rotation; one file per install run, or an
//!   appended per-tool file for the docker and test commands)
//!
//! Log level is controlled by `RUST_LOG` (default: info, or debug with
//! `--verbose`).

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keeps the file writer flushing until dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    })
}

/// Initialize console logging plus, when `log_file` is given, an identical
/// copy of every line in that file.
///
/// A second call is a no-op (the first subscriber stays installed).
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> LoggingGuard {
    let file_writer = log_file.and_then(|path| {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name()?.to_string_lossy().into_owned();
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(name)
            .build(dir);
        match appender {
            Ok(appender) => Some(tracing_appender::non_blocking(appender)),
            Err(e) => {
                eprintln!("Failed to open log file {}: {e}", path.display());
                None
            }
        }
    });
    let (file_writer, guard) = match file_writer {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false) // No ANSI colors in files
                .with_target(false)
        }))
        .try_init()
        .ok(); // Ignore error if already initialized

    LoggingGuard { _file: guard }
}
