//! Exclusive advisory lock held for the duration of a pipeline run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use hailo8_core::{InstallError, InstallResult};
use tracing::debug;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::fcntl::{Flock, FlockArg};

/// Held lock on `install_state.lock`. Released on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    #[cfg(unix)]
    _file: Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl StateLock {
    /// Take the lock without blocking.
    ///
    /// Fails with [`InstallError::Locked`] when another process holds it.
    pub fn acquire(path: &Path) -> InstallResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| InstallError::io(path, e))?;

        #[cfg(unix)]
        let file = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(mut locked) => {
                // Record the holder for operators inspecting a stuck lock.
                let _ = locked.set_len(0);
                let _ = writeln!(locked, "{}", std::process::id());
                locked
            }
            Err((_, Errno::EWOULDBLOCK)) => return Err(InstallError::Locked(path.to_path_buf())),
            Err((_, errno)) => {
                return Err(InstallError::io(path, std::io::Error::from(errno)));
            }
        };

        debug!(path = %path.display(), "Acquired install lock");
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_fast() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("install_state.lock");

        let first = StateLock::acquire(&path).unwrap();
        let second = StateLock::acquire(&path);
        assert!(matches!(second, Err(InstallError::Locked(_))));

        drop(first);
        assert!(StateLock::acquire(&path).is_ok());
    }

    #[test]
    fn creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("install_state.lock");
        let lock = StateLock::acquire(&path).unwrap();
        assert!(lock.path().exists());
    }
}
