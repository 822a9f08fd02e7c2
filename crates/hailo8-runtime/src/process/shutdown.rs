//! Process-group termination with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Grace period between SIGTERM and SIGKILL.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// Terminate a child and every process in its group, then reap it.
///
/// The child must have been spawned as a process-group leader
/// (`process_group(0)`) so shell pipelines and package-manager helpers die
/// with it. `group` is the leader's pid as read right after spawn; the
/// group is signalled even when the leader itself has already been reaped,
/// since background children can outlive it.
///
/// # Strategy
/// 1. SIGTERM the group and wait up to `grace` for the leader to exit
/// 2. SIGKILL the group (also sweeps stragglers that ignored SIGTERM)
/// 3. Wait for the leader so no zombie is left behind
pub async fn terminate_group(
    child: &mut Child,
    group: Option<u32>,
    grace: Duration,
) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        terminate_unix(child, group, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = (group, grace);
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn terminate_unix(
    child: &mut Child,
    group: Option<u32>,
    grace: Duration,
) -> io::Result<ExitStatus> {
    let Some(pid) = group.or_else(|| child.id()) else {
        return child.wait().await;
    };
    let group = Pid::from_raw(i32::try_from(pid).map_err(io::Error::other)?);

    // Phase 1: SIGTERM with grace period
    match signal::killpg(group, Signal::SIGTERM) {
        Ok(()) => {}
        // Nothing left in the group
        Err(Errno::ESRCH) => return child.wait().await,
        Err(e) => return Err(io::Error::other(e)),
    }

    let exited = timeout(grace, child.wait()).await;

    // Phase 2: SIGKILL whatever is left of the group
    if let Err(e) = signal::killpg(group, Signal::SIGKILL) {
        if e != Errno::ESRCH {
            tracing::debug!(pid, error = %e, "SIGKILL to process group failed");
        }
    }

    // Phase 3: reap
    match exited {
        Ok(status) => status,
        Err(_) => child.wait().await,
    }
}
