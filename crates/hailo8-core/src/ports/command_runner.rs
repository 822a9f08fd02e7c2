//! Command runner port.
//!
//! Every interaction with the host (package managers, `systemctl`, `docker`,
//! `modprobe`, ...) goes through this trait so the pipeline can be driven
//! by a scripted fake in tests.
//!
//! # Design Notes
//!
//! - Core owns the trait and the request/response types
//! - Runtime owns the implementation (`tokio::process` with process-group kill)
//! - Failure is data: a non-zero exit, a timeout or a spawn failure all come
//!   back as a [`CommandOutput`], never as an `Err`

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Default timeout for a shell command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// A command to execute, as an argv vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            cwd: None,
        }
    }

    /// Build from a full argv; an empty slice yields an empty program that
    /// fails to spawn.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Self {
        let mut iter = argv.iter().map(|s| s.as_ref().to_string());
        let program = iter.next().unwrap_or_default();
        Self::new(program).args(iter)
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// How a command finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Exited(i32),
    /// Terminated by a signal it did not handle.
    Signaled,
    /// Killed after exceeding its timeout.
    TimedOut(Duration),
    /// The program could not be started at all.
    SpawnFailed(String),
}

/// Captured result of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Exited(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::exited(0, stdout, "")
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self::exited(1, "", stderr)
    }

    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            status: CommandStatus::TimedOut(timeout),
            stdout: String::new(),
            stderr: format!("Command timed out after {} seconds", timeout.as_secs()),
        }
    }

    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            status: CommandStatus::SpawnFailed(reason.clone()),
            stdout: String::new(),
            stderr: reason,
        }
    }

    pub fn success(&self) -> bool {
        self.status == CommandStatus::Exited(0)
    }

    /// Best single-line description of a failure.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.lines().last().unwrap_or(stderr).to_string();
        }
        match &self.status {
            CommandStatus::Exited(code) => format!("exit code {code}"),
            CommandStatus::Signaled => "terminated by signal".to_string(),
            CommandStatus::TimedOut(t) => format!("timed out after {}s", t.as_secs()),
            CommandStatus::SpawnFailed(reason) => reason.clone(),
        }
    }
}

/// Port for running external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `spec` to completion or timeout.
    async fn run(&self, spec: &CommandSpec) -> CommandOutput;
}
