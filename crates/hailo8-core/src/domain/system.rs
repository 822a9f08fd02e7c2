//! Host facts probed once per run.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Distributions the installer has been exercised on.
pub const SUPPORTED_DISTROS: [&str; 5] = ["ubuntu", "debian", "centos", "rhel", "fedora"];

/// Architectures the PCIe driver package is built for.
pub const SUPPORTED_ARCHES: [&str; 2] = ["x86_64", "amd64"];

/// System package manager, probed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Yum,
    Dnf,
}

impl PackageManager {
    pub const PROBE_ORDER: [Self; 3] = [Self::Apt, Self::Yum, Self::Dnf];

    pub const fn command(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Yum => "yum",
            Self::Dnf => "dnf",
        }
    }

    pub const fn is_debian_family(self) -> bool {
        matches!(self, Self::Apt)
    }

    /// Build and driver prerequisites for this package manager.
    pub fn dependency_packages(self, kernel_release: &str) -> Vec<String> {
        match self {
            Self::Apt => [
                "build-essential",
                "python3-dev",
                "python3-pip",
                "cmake",
                "git",
                "wget",
                "curl",
                "dkms",
            ]
            .iter()
            .map(ToString::to_string)
            .chain([
                format!("linux-headers-{kernel_release}"),
                "pciutils".to_string(),
            ])
            .collect(),
            Self::Yum | Self::Dnf => [
                "gcc",
                "gcc-c++",
                "make",
                "python3-devel",
                "python3-pip",
                "cmake",
                "git",
                "wget",
                "curl",
                "dkms",
                "kernel-devel",
                "pciutils",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }

    /// Parse the name recorded in rollback data.
    pub fn from_command(name: &str) -> Option<Self> {
        Self::PROBE_ORDER.into_iter().find(|pm| pm.command() == name)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Distribution family, used to pick the Docker install recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    Debian,
    RedHat,
    Other,
}

impl DistroFamily {
    /// Classify an `/etc/os-release` ID plus its `ID_LIKE` list.
    pub fn classify(id: &str, id_like: &[String]) -> Self {
        let matches_any = |names: &[&str]| {
            names.contains(&id) || id_like.iter().any(|l| names.contains(&l.as_str()))
        };
        if matches_any(&["ubuntu", "debian"]) {
            Self::Debian
        } else if matches_any(&["centos", "rhel", "fedora"]) {
            Self::RedHat
        } else {
            Self::Other
        }
    }
}

/// Facts about the host the pipeline runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub kernel_release: String,
    pub arch: String,
    pub distro_id: String,
    pub distro_version: String,
    pub distro_pretty_name: String,
    pub distro_family: DistroFamily,
    pub package_manager: Option<PackageManager>,
}

impl SystemInfo {
    pub fn is_supported_distro(&self) -> bool {
        SUPPORTED_DISTROS.contains(&self.distro_id.as_str())
    }

    pub fn is_supported_arch(&self) -> bool {
        SUPPORTED_ARCHES.contains(&self.arch.as_str())
    }

    /// Major component of the kernel release (`5.15.0-91-generic` → 5).
    pub fn kernel_major(&self) -> Option<u32> {
        parse_kernel_major(&self.kernel_release)
    }
}

/// Parse the leading integer of a kernel release string.
pub fn parse_kernel_major(release: &str) -> Option<u32> {
    let digits: String = release
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// What accelerator pieces are currently visible on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareAvailability {
    /// A device with the Hailo PCIe vendor ID shows up in `lspci`.
    pub pcie_device: bool,
    /// The kernel module appears in `lsmod`.
    pub driver_loaded: bool,
    /// Configured device nodes that exist.
    pub device_nodes: Vec<PathBuf>,
    /// `hailortcli` is on `PATH`.
    pub runtime_cli: bool,
    /// `hailo_platform` imports in the system Python.
    pub python_binding: bool,
    pub nvidia_gpu: bool,
}

impl HardwareAvailability {
    pub fn has_device_node(&self) -> bool {
        !self.device_nodes.is_empty()
    }

    /// Driver loaded and the device reachable through a node or the bus.
    pub fn accelerator_ready(&self) -> bool {
        self.driver_loaded && (self.has_device_node() || self.pcie_device)
    }
}
