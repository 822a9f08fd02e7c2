//! Installer configuration types and validation.
//!
//! Every field has a default so an empty or partial YAML file is valid.
//! JSON is a subset of YAML, so JSON config files load as well.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_MAX_RETRIES;

/// Default install directory.
pub const DEFAULT_INSTALL_DIR: &str = "/opt/hailo8";

/// Environment variable overriding the install directory.
pub const INSTALL_DIR_ENV: &str = "HAILO8_INSTALL_DIR";

/// PCI vendor ID of Hailo devices.
pub const HAILO_PCIE_VENDOR_ID: &str = "1e60";

/// Top-level installer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Root for state, logs and backups.
    pub install_dir: PathBuf,

    /// Directory holding the driver/runtime `.deb` and `.whl` files.
    /// Defaults to `<install_dir>/packages`.
    pub packages_dir: Option<PathBuf>,

    /// Attempts per component before its repair runs.
    pub max_retries: u32,

    /// Fail the system check when not running as root.
    pub require_root: bool,

    /// Minimum free space on the install filesystem, in GB.
    pub min_free_disk_gb: f64,

    pub docker: DockerSettings,
    pub hailo: HailoSettings,
    pub timeouts: TimeoutSettings,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            packages_dir: None,
            max_retries: DEFAULT_MAX_RETRIES,
            require_root: true,
            min_free_disk_gb: 2.0,
            docker: DockerSettings::default(),
            hailo: HailoSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl InstallerConfig {
    /// Parse a YAML (or JSON) document.
    pub fn from_yaml_str(text: &str) -> Result<Self, SettingsError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_yaml_str(&text)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Effective packages directory.
    pub fn packages_dir(&self) -> PathBuf {
        self.packages_dir
            .clone()
            .unwrap_or_else(|| self.install_dir.join("packages"))
    }
}

/// Docker integration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerSettings {
    pub image_name: String,
    pub base_image: String,
    /// Written verbatim to the daemon config file.
    pub daemon_config: serde_json::Value,
    pub daemon_config_path: PathBuf,
    /// Containers removed by the cleanup command.
    pub container_names: Vec<String>,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            image_name: "hailo8:latest".to_string(),
            base_image: "ubuntu:22.04".to_string(),
            daemon_config: serde_json::json!({
                "default-runtime": "runc",
                "runtimes": {
                    "hailo": { "path": "/usr/bin/runc" }
                }
            }),
            daemon_config_path: PathBuf::from("/etc/docker/daemon.json"),
            container_names: vec!["hailo8-runtime".to_string()],
        }
    }
}

impl DockerSettings {
    /// Repository part of `image_name` (`hailo8:latest` → `hailo8`).
    pub fn image_repository(&self) -> &str {
        self.image_name
            .rsplit_once(':')
            .filter(|(_, tag)| !tag.contains('/'))
            .map_or(self.image_name.as_str(), |(repo, _)| repo)
    }
}

/// Accelerator device settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HailoSettings {
    pub device_nodes: Vec<PathBuf>,
    pub driver_module: String,
    pub pcie_vendor_id: String,
}

impl Default for HailoSettings {
    fn default() -> Self {
        Self {
            device_nodes: vec![PathBuf::from("/dev/hailo0"), PathBuf::from("/dev/hailo_pci")],
            driver_module: "hailo_pci".to_string(),
            pcie_vendor_id: HAILO_PCIE_VENDOR_ID.to_string(),
        }
    }
}

/// Command timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub default_secs: u64,
    pub package_secs: u64,
    pub image_build_secs: u64,
    pub container_test_secs: u64,
    pub probe_secs: u64,
    pub quick_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            default_secs: 300,
            package_secs: 600,
            image_build_secs: 1800,
            container_test_secs: 120,
            probe_secs: 30,
            quick_secs: 5,
        }
    }
}

impl TimeoutSettings {
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    pub const fn package(&self) -> Duration {
        Duration::from_secs(self.package_secs)
    }

    pub const fn image_build(&self) -> Duration {
        Duration::from_secs(self.image_build_secs)
    }

    pub const fn container_test(&self) -> Duration {
        Duration::from_secs(self.container_test_secs)
    }

    pub const fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub const fn quick(&self) -> Duration {
        Duration::from_secs(self.quick_secs)
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("max_retries must be at least 1")]
    ZeroRetries,

    #[error("min_free_disk_gb must be a non-negative number, got {0}")]
    InvalidDiskThreshold(f64),

    #[error("install_dir cannot be empty")]
    EmptyInstallDir,

    #[error("docker.image_name cannot be empty")]
    EmptyImageName,

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration.
pub fn validate_config(config: &InstallerConfig) -> Result<(), SettingsError> {
    if config.install_dir.as_os_str().is_empty() {
        return Err(SettingsError::EmptyInstallDir);
    }
    if config.max_retries == 0 {
        return Err(SettingsError::ZeroRetries);
    }
    if !config.min_free_disk_gb.is_finite() || config.min_free_disk_gb < 0.0 {
        return Err(SettingsError::InvalidDiskThreshold(config.min_free_disk_gb));
    }
    if config.docker.image_name.trim().is_empty() {
        return Err(SettingsError::EmptyImageName);
    }

    let t = &config.timeouts;
    for (name, secs) in [
        ("default_secs", t.default_secs),
        ("package_secs", t.package_secs),
        ("image_build_secs", t.image_build_secs),
        ("container_test_secs", t.container_test_secs),
        ("probe_secs", t.probe_secs),
        ("quick_secs", t.quick_secs),
    ] {
        if secs == 0 {
            return Err(SettingsError::ZeroTimeout(name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstallerConfig::default();
        assert_eq!(config.install_dir, PathBuf::from("/opt/hailo8"));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.packages_dir(), PathBuf::from("/opt/hailo8/packages"));
        assert_eq!(config.docker.image_name, "hailo8:latest");
        assert_eq!(config.hailo.driver_module, "hailo_pci");
        assert_eq!(config.timeouts.image_build(), Duration::from_secs(1800));
        assert!(config.docker.daemon_config.get("runtimes").is_some());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "
max_retries: 5
docker:
  image_name: hailo8:dev
timeouts:
  package_secs: 900
";
        let config = InstallerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.docker.image_name, "hailo8:dev");
        assert_eq!(config.docker.base_image, "ubuntu:22.04");
        assert_eq!(config.timeouts.package_secs, 900);
        assert_eq!(config.timeouts.default_secs, 300);
    }

    #[test]
    fn test_json_config_is_accepted() {
        let json = r#"{"hailo": {"device_nodes": ["/dev/hailo1"]}}"#;
        let config = InstallerConfig::from_yaml_str(json).unwrap();
        assert_eq!(config.hailo.device_nodes, vec![PathBuf::from("/dev/hailo1")]);
        assert_eq!(config.hailo.driver_module, "hailo_pci");
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(
            InstallerConfig::from_yaml_str("  \n").unwrap(),
            InstallerConfig::default()
        );
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let result = InstallerConfig::from_yaml_str("max_retries: [1, 2");
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let config = InstallerConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(validate_config(&config), Err(SettingsError::ZeroRetries));
    }

    #[test]
    fn test_validate_rejects_negative_disk_threshold() {
        let config = InstallerConfig {
            min_free_disk_gb: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(SettingsError::InvalidDiskThreshold(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = InstallerConfig::default();
        config.timeouts.quick_secs = 0;
        assert_eq!(
            validate_config(&config),
            Err(SettingsError::ZeroTimeout("quick_secs"))
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hailo8.yaml");
        std::fs::write(&path, "require_root: false\n").unwrap();
        let config = InstallerConfig::load(&path).unwrap();
        assert!(!config.require_root);

        let missing = InstallerConfig::load(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(SettingsError::Read { .. })));
    }

    #[test]
    fn test_image_repository() {
        let mut docker = DockerSettings::default();
        assert_eq!(docker.image_repository(), "hailo8");
        docker.image_name = "registry:5000/hailo8".to_string();
        assert_eq!(docker.image_repository(), "registry:5000/hailo8");
        docker.image_name = "plain".to_string();
        assert_eq!(docker.image_repository(), "plain");
    }
}
