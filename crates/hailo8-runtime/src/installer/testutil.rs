//! Shared fixtures for stage and installer tests.

use std::path::PathBuf;
use std::sync::Arc;

use hailo8_core::testing::ScriptedRunner;
use hailo8_core::{
    DistroFamily, HardwareAvailability, InstallLayout, InstallerConfig, PackageManager, SystemInfo,
};
use tempfile::TempDir;

use super::context::StageContext;

pub const PACKAGE_FILES: [&str; 3] = [
    "hailort-pcie-driver_4.23.0_all.deb",
    "hailort_4.23.0_amd64.deb",
    "hailort-4.23.0-cp313-cp313-linux_x86_64.whl",
];

/// A temporary install root with a config pointing every host path into it.
pub struct Fixture {
    _dir: TempDir,
    pub runner: Arc<ScriptedRunner>,
    pub config: InstallerConfig,
    pub layout: InstallLayout,
    pub hardware: HardwareAvailability,
}

impl Fixture {
    pub fn new(runner: ScriptedRunner) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let mut config = InstallerConfig {
            install_dir: root.join("hailo8"),
            packages_dir: Some(root.join("packages")),
            require_root: false,
            min_free_disk_gb: 0.0,
            ..InstallerConfig::default()
        };
        config.hailo.device_nodes = vec![root.join("dev/hailo0"), root.join("dev/hailo_pci")];
        config.docker.daemon_config_path = root.join("docker/daemon.json");

        let layout = InstallLayout::new(&config.install_dir);
        layout.ensure_dirs().unwrap();

        Self {
            _dir: dir,
            runner: Arc::new(runner),
            config,
            layout,
            hardware: HardwareAvailability {
                pcie_device: true,
                driver_loaded: true,
                ..HardwareAvailability::default()
            },
        }
    }

    /// Like [`Fixture::new`] with driver, runtime and wheel packages present.
    pub fn with_packages(runner: ScriptedRunner) -> Self {
        let fixture = Self::new(runner);
        let packages = fixture.config.packages_dir();
        std::fs::create_dir_all(&packages).unwrap();
        for name in PACKAGE_FILES {
            std::fs::write(packages.join(name), b"package").unwrap();
        }
        fixture
    }

    /// Create the first configured device node.
    pub fn create_device_node(&self) -> PathBuf {
        let node = self.config.hailo.device_nodes[0].clone();
        std::fs::create_dir_all(node.parent().unwrap()).unwrap();
        std::fs::write(&node, "").unwrap();
        node
    }

    pub fn context<'a>(&'a self, system: &'a SystemInfo) -> StageContext<'a> {
        StageContext {
            runner: self.runner.clone(),
            config: &self.config,
            layout: &self.layout,
            system,
            hardware: &self.hardware,
        }
    }
}

/// Ubuntu 22.04 on x86_64 with apt.
pub fn sample_system() -> SystemInfo {
    SystemInfo {
        os: "Linux".into(),
        kernel_release: "5.15.0-91-generic".into(),
        arch: "x86_64".into(),
        distro_id: "ubuntu".into(),
        distro_version: "22.04".into(),
        distro_pretty_name: "Ubuntu 22.04.4 LTS".into(),
        distro_family: DistroFamily::Debian,
        package_manager: Some(PackageManager::Apt),
    }
}
