//! Privilege and disk-space checks.

use std::io;
use std::path::Path;

/// True when running with effective UID 0.
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }

    #[cfg(not(unix))]
    {
        false
    }
}

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Free space available to unprivileged users on the filesystem holding
/// `path`, in GB. A path that does not exist yet is measured at its
/// nearest existing ancestor.
pub fn free_disk_gb(path: &Path) -> io::Result<f64> {
    let existing = path
        .ancestors()
        .find(|p| p.exists())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no existing ancestor"))?;

    #[cfg(unix)]
    {
        let stat = nix::sys::statvfs::statvfs(existing).map_err(io::Error::from)?;
        #[allow(clippy::cast_precision_loss, clippy::useless_conversion)]
        let bytes = u64::from(stat.blocks_available()) as f64 * u64::from(stat.fragment_size()) as f64;
        Ok(bytes / BYTES_PER_GB)
    }

    #[cfg(not(unix))]
    {
        let _ = existing;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "disk space check requires a unix host",
        ))
    }
}
