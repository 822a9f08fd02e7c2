//! On-disk layout under the install directory.

use std::path::{Path, PathBuf};

/// State file name.
pub const STATE_FILE_NAME: &str = "install_state.json";

/// Advisory lock file name.
pub const LOCK_FILE_NAME: &str = "install_state.lock";

/// Docker manager log, written to the working directory.
pub const DOCKER_LOG_FILE_NAME: &str = "docker_hailo8.log";

/// Validation tester log, written to the working directory.
pub const TEST_LOG_FILE_NAME: &str = "hailo8_test.log";

/// Default validation report file name.
pub const TEST_REPORT_FILE_NAME: &str = "hailo8_test_report.txt";

/// Paths derived from the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: install_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE_NAME)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backup")
    }

    /// Per-invocation install log (`hailo8_install_<unix-ts>.log`).
    pub fn install_log_file_name(unix_ts: i64) -> String {
        format!("hailo8_install_{unix_ts}.log")
    }

    /// Create the install, log and backup directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.root.clone(), self.logs_dir(), self.backup_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Find a file in `dir` whose name starts with `prefix` and ends with
/// `suffix`. With several matches the last one in name order is returned.
pub fn find_package(dir: &Path, prefix: &str, suffix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix) && n.ends_with(suffix))
        })
        .collect();
    matches.sort();
    matches.pop()
}

/// Version segment of a Debian-style package file name
/// (`hailort-pcie-driver_4.23.0_all.deb` → `4.23.0`).
pub fn package_version(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if let Some(stem) = name.strip_suffix(".deb") {
        return stem.split('_').nth(1).map(str::to_string);
    }
    if let Some(stem) = name.strip_suffix(".whl") {
        return stem.split('-').nth(1).map(str::to_string);
    }
    None
}
