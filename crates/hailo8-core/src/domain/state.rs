//! Explicit pipeline state owned by the orchestrator.
//!
//! `PipelineState` keeps one [`InstallComponent`] per [`ComponentType`] in
//! install order and guards the status transitions the orchestrator is
//! allowed to make. The on-disk form is [`InstallStateDocument`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::component::{ComponentType, InstallComponent, InstallStatus};
use crate::error::TransitionError;

/// Serialized shape of `install_state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallStateDocument {
    pub components: BTreeMap<String, serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub install_dir: PathBuf,
}

/// In-memory state of every component in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    components: Vec<InstallComponent>,
    install_dir: PathBuf,
    timestamp: DateTime<Utc>,
}

impl PipelineState {
    /// All components `Pending`.
    pub fn new(install_dir: impl Into<PathBuf>, max_retries: u32) -> Self {
        Self {
            components: ComponentType::ALL
                .into_iter()
                .map(|c| InstallComponent::new(c, max_retries))
                .collect(),
            install_dir: install_dir.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Time of the last persisted change.
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }

    /// Components in install order.
    pub fn components(&self) -> impl Iterator<Item = &InstallComponent> {
        self.components.iter()
    }

    pub fn component(&self, component: ComponentType) -> &InstallComponent {
        &self.components[component.position()]
    }

    /// Mutable access for stages recording `version` and `rollback_data`.
    ///
    /// Status changes go through the `mark_*` methods.
    pub fn component_mut(&mut self, component: ComponentType) -> &mut InstallComponent {
        &mut self.components[component.position()]
    }

    pub fn status(&self, component: ComponentType) -> InstallStatus {
        self.component(component).status
    }

    /// The component currently `Running`, if any.
    pub fn running(&self) -> Option<ComponentType> {
        self.components
            .iter()
            .find(|c| c.status == InstallStatus::Running)
            .map(|c| c.component_type)
    }

    /// True when every component before `component` is `Success`.
    pub fn predecessors_succeeded(&self, component: ComponentType) -> bool {
        self.components[..component.position()]
            .iter()
            .all(InstallComponent::is_success)
    }

    pub fn all_succeeded(&self) -> bool {
        self.components.iter().all(InstallComponent::is_success)
    }

    /// First component that is not `Success`.
    pub fn first_incomplete(&self) -> Option<ComponentType> {
        self.components
            .iter()
            .find(|c| !c.is_success())
            .map(|c| c.component_type)
    }

    /// Enter `Running`.
    ///
    /// Refused while another component is running or an earlier component
    /// has not succeeded.
    pub fn mark_running(&mut self, component: ComponentType) -> Result<(), TransitionError> {
        if let Some(other) = self.running() {
            if other != component {
                return Err(TransitionError::AlreadyRunning {
                    requested: component,
                    running: other,
                });
            }
        }
        if let Some(blocker) = self.components[..component.position()]
            .iter()
            .find(|c| !c.is_success())
        {
            return Err(TransitionError::OutOfOrder {
                requested: component,
                blocked_by: blocker.component_type,
            });
        }
        self.component_mut(component).status = InstallStatus::Running;
        self.touch();
        Ok(())
    }

    pub fn mark_success(&mut self, component: ComponentType) {
        let entry = self.component_mut(component);
        entry.status = InstallStatus::Success;
        entry.error_msg.clear();
        self.touch();
    }

    /// Count a failed attempt; the component waits for its next attempt.
    pub fn record_failure(&mut self, component: ComponentType, error: impl Into<String>) {
        let entry = self.component_mut(component);
        entry.retry_count += 1;
        entry.error_msg = error.into();
        entry.status = InstallStatus::Pending;
        self.touch();
    }

    pub fn mark_failed(&mut self, component: ComponentType, error: Option<String>) {
        let entry = self.component_mut(component);
        entry.status = InstallStatus::Failed;
        if let Some(error) = error {
            entry.error_msg = error;
        }
        self.touch();
    }

    /// `Failed → Recovered` after a successful repair.
    pub fn mark_recovered(&mut self, component: ComponentType) -> Result<(), TransitionError> {
        let entry = self.component_mut(component);
        if entry.status != InstallStatus::Failed {
            return Err(TransitionError::NotFailed {
                component,
                status: entry.status,
            });
        }
        entry.status = InstallStatus::Recovered;
        self.touch();
        Ok(())
    }

    pub fn mark_rollback(&mut self, component: ComponentType) {
        self.component_mut(component).status = InstallStatus::Rollback;
        self.touch();
    }

    /// Prepare a new run: every incomplete component is `Pending` with a
    /// fresh retry budget of `max_retries`. Successful components are left
    /// alone.
    pub fn reset_for_new_run(&mut self, max_retries: u32) {
        for entry in self.components.iter_mut().filter(|c| !c.is_success()) {
            entry.status = InstallStatus::Pending;
            entry.retry_count = 0;
            entry.max_retries = max_retries.max(1);
        }
        self.touch();
    }

    /// Return every component to a clean `Pending` record.
    pub fn reset_all(&mut self) {
        for entry in &mut self.components {
            entry.status = InstallStatus::Pending;
            entry.error_msg.clear();
            entry.retry_count = 0;
            entry.version.clear();
            entry.rollback_data.clear();
        }
        self.touch();
    }

    pub fn to_document(&self) -> InstallStateDocument {
        let components = self
            .components
            .iter()
            .filter_map(|c| {
                serde_json::to_value(c)
                    .ok()
                    .map(|v| (c.component_type.key().to_string(), v))
            })
            .collect();
        InstallStateDocument {
            components,
            timestamp: self.timestamp,
            install_dir: self.install_dir.clone(),
        }
    }

    /// Rebuild state from a persisted document.
    ///
    /// Unknown keys and unreadable entries are ignored and fall back to a
    /// pending component. A component persisted as `Running` belonged to an
    /// interrupted run and is loaded as `Pending`.
    pub fn from_document(
        doc: InstallStateDocument,
        install_dir: impl Into<PathBuf>,
        max_retries: u32,
    ) -> Self {
        let mut state = Self::new(install_dir, max_retries);
        state.timestamp = doc.timestamp;
        for (key, value) in doc.components {
            let Ok(component_type) = key.parse::<ComponentType>() else {
                tracing::debug!(key = %key, "Ignoring unknown component in state file");
                continue;
            };
            match serde_json::from_value::<InstallComponent>(value) {
                Ok(mut entry) => {
                    entry.component_type = component_type;
                    if entry.status == InstallStatus::Running {
                        entry.status = InstallStatus::Pending;
                    }
                    *state.component_mut(component_type) = entry;
                }
                Err(e) => {
                    tracing::warn!(component = %component_type, error = %e, "Unreadable component entry, using defaults");
                }
            }
        }
        state
    }
}
