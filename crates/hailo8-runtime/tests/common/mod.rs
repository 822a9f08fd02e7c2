//! Shared setup for installer integration tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use hailo8_core::InstallerConfig;
use hailo8_core::testing::ScriptedRunner;
use hailo8_runtime::Installer;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

/// A scripted host whose install dir, packages, device node and Docker
/// daemon config all live in a temp directory.
pub struct TestHost {
    pub dir: TempDir,
    pub runner: Arc<ScriptedRunner>,
    pub config: InstallerConfig,
}

impl TestHost {
    /// Healthy Ubuntu host with all packages and a device node present.
    pub fn healthy() -> Self {
        Self::with_runner(ScriptedRunner::healthy_host())
    }

    pub fn with_runner(runner: ScriptedRunner) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path();

        let packages = root.join("packages");
        std::fs::create_dir_all(&packages).expect("Failed to create packages dir");
        for name in [
            "hailort-pcie-driver_4.23.0_all.deb",
            "hailort_4.23.0_amd64.deb",
            "hailort-4.23.0-cp313-cp313-linux_x86_64.whl",
        ] {
            std::fs::write(packages.join(name), b"package").expect("Failed to write package");
        }

        let node = root.join("dev").join("hailo0");
        std::fs::create_dir_all(root.join("dev")).expect("Failed to create dev dir");
        std::fs::write(&node, "").expect("Failed to create device node");

        let mut config = InstallerConfig {
            install_dir: root.join("hailo8"),
            packages_dir: Some(packages),
            require_root: false,
            min_free_disk_gb: 0.0,
            ..InstallerConfig::default()
        };
        config.hailo.device_nodes = vec![node];
        config.docker.daemon_config_path = root.join("docker").join("daemon.json");

        Self {
            dir,
            runner: Arc::new(runner),
            config,
        }
    }

    pub fn installer(&self) -> Installer {
        Installer::new(self.runner.clone(), self.config.clone())
            .expect("Failed to create installer")
    }

    /// Position of the first recorded command line starting with `prefix`.
    pub fn first_call(&self, prefix: &str) -> Option<usize> {
        self.runner
            .command_lines()
            .iter()
            .position(|line| line.starts_with(prefix))
    }
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Route this thread's tracing output at INFO and above into a new
    /// buffer until the returned guard is dropped.
    pub fn capture() -> (Self, tracing::subscriber::DefaultGuard) {
        let buffer = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (buffer, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
