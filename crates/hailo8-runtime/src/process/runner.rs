//! `tokio::process` implementation of the command runner port.

use std::process::Stdio;

use async_trait::async_trait;
use hailo8_core::ports::{CommandOutput, CommandRunner, CommandSpec, CommandStatus};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, warn};

use super::shutdown::{TERMINATION_GRACE, terminate_group};

/// Runs commands as real child processes.
///
/// Each command is its own process-group leader so a timeout can take down
/// everything it spawned.
#[derive(Debug, Clone, Default)]
pub struct ProcessCommandRunner;

impl ProcessCommandRunner {
    pub const fn new() -> Self {
        Self
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "Failed to read child output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutput {
        debug!(command = %spec, timeout_secs = spec.timeout.as_secs(), "Executing command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %spec, error = %e, "Failed to spawn command");
                return CommandOutput::spawn_failed(format!("{}: {e}", spec.program));
            }
        };

        let group = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut drain =
            tokio::spawn(async move { tokio::join!(read_pipe(stdout), read_pipe(stderr)) });
        let deadline = Instant::now() + spec.timeout;

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(command = %spec, error = %e, "Failed to wait for command");
                drain.abort();
                return CommandOutput::spawn_failed(format!("{}: {e}", spec.program));
            }
            Err(_) => {
                warn!(command = %spec, timeout_secs = spec.timeout.as_secs(), "Command timed out, terminating");
                if let Err(e) = terminate_group(&mut child, group, TERMINATION_GRACE).await {
                    warn!(command = %spec, error = %e, "Failed to terminate timed out command");
                }
                drain.abort();
                return CommandOutput::timed_out(spec.timeout);
            }
        };

        // The leader is gone but background children may still hold the pipes.
        let (stdout, stderr) = match timeout_at(deadline, &mut drain).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => {
                warn!(command = %spec, "Command exited but left processes holding its output, terminating group");
                if let Err(e) = terminate_group(&mut child, group, TERMINATION_GRACE).await {
                    warn!(command = %spec, error = %e, "Failed to terminate leftover processes");
                }
                match timeout(TERMINATION_GRACE, &mut drain).await {
                    Ok(joined) => joined.unwrap_or_default(),
                    Err(_) => {
                        drain.abort();
                        (String::new(), String::new())
                    }
                }
            }
        };

        let status = status
            .code()
            .map_or(CommandStatus::Signaled, CommandStatus::Exited);

        let output = CommandOutput {
            status,
            stdout,
            stderr,
        };
        if !output.success() {
            warn!(
                command = %spec,
                status = ?output.status,
                reason = %output.failure_reason(),
                "Command failed"
            );
        }
        output
    }
}
