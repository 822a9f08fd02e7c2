//! Installable components and their lifecycle status.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default number of install attempts before a repair is tried.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// One stage of the installation pipeline.
///
/// The variant order is the install order; [`ComponentType::ALL`] is the
/// registry the orchestrator iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    SystemCheck,
    Dependencies,
    PcieDriver,
    #[serde(rename = "hailort")]
    HailoRT,
    DockerConfig,
    Validation,
}

impl ComponentType {
    /// Every component in install order.
    pub const ALL: [Self; 6] = [
        Self::SystemCheck,
        Self::Dependencies,
        Self::PcieDriver,
        Self::HailoRT,
        Self::DockerConfig,
        Self::Validation,
    ];

    /// Key used in the persisted state document.
    pub const fn key(self) -> &'static str {
        match self {
            Self::SystemCheck => "system_check",
            Self::Dependencies => "dependencies",
            Self::PcieDriver => "pcie_driver",
            Self::HailoRT => "hailort",
            Self::DockerConfig => "docker_config",
            Self::Validation => "validation",
        }
    }

    /// Human readable name shown in logs and the status table.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::SystemCheck => "System Check",
            Self::Dependencies => "Dependencies",
            Self::PcieDriver => "PCIe Driver",
            Self::HailoRT => "HailoRT",
            Self::DockerConfig => "Docker Config",
            Self::Validation => "Validation",
        }
    }

    /// Zero-based position in the install order.
    pub fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| format!("unknown component '{s}'"))
    }
}

/// Lifecycle status of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Rollback,
    Recovered,
}

impl InstallStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Rollback => "rollback",
            Self::Recovered => "recovered",
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form data a stage records so rollback can undo it.
pub type RollbackData = BTreeMap<String, serde_json::Value>;

/// Persisted record for a single component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default)]
    pub status: InstallStatus,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default)]
    pub rollback_data: RollbackData,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl InstallComponent {
    /// A fresh, pending component.
    pub fn new(component_type: ComponentType, max_retries: u32) -> Self {
        Self {
            name: component_type.display_name().to_string(),
            component_type,
            status: InstallStatus::Pending,
            version: String::new(),
            error_msg: String::new(),
            rollback_data: RollbackData::new(),
            retry_count: 0,
            max_retries: max_retries.max(1),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == InstallStatus::Success
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Store a rollback value under `key`.
    pub fn record<V: Serialize>(&mut self, key: &str, value: V) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.rollback_data.insert(key.to_string(), v);
            }
            Err(e) => tracing::warn!(key, error = %e, "Failed to record rollback data"),
        }
    }

    /// Whether a value was stored under `key`. Stages use this to take
    /// pre-install snapshots on the first attempt only.
    pub fn is_recorded(&self, key: &str) -> bool {
        self.rollback_data.contains_key(key)
    }

    pub fn recorded_bool(&self, key: &str) -> Option<bool> {
        self.rollback_data.get(key).and_then(serde_json::Value::as_bool)
    }

    /// Read a string value previously stored with [`record`](Self::record).
    pub fn recorded_str(&self, key: &str) -> Option<&str> {
        self.rollback_data.get(key).and_then(|v| v.as_str())
    }

    /// Read a list of strings previously stored with [`record`](Self::record).
    pub fn recorded_list(&self, key: &str) -> Vec<String> {
        self.rollback_data
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
