//! Installation pipeline orchestrator.
//!
//! Components run strictly in [`ComponentType::ALL`] order. Each one is
//! attempted up to `max_retries` times; when the budget is spent its
//! [`RepairStrategy`] runs once. A failed repair halts the pipeline and
//! leaves the state file describing exactly where it stopped, so the next
//! run resumes at that component.
//!
//! Every status change is written through to the [`StateStore`] before the
//! pipeline moves on.

mod context;
mod repair;
mod rollback;
pub mod stages;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;

use hailo8_core::ports::CommandRunner;
use hailo8_core::{
    ComponentType, HardwareAvailability, InstallError, InstallLayout, InstallResult,
    InstallStatus, InstallerConfig, PipelineState, StageResult, SystemInfo,
};
use tracing::{debug, error, info, warn};

pub use context::StageContext;
pub use repair::RepairStrategy;
pub use rollback::{RollbackSummary, revert_host};

use crate::state::{StateLock, StateStore};
use crate::system::{detect_system_info, probe_hardware};

/// Drives the six components through install, retry, repair and rollback.
pub struct Installer {
    runner: Arc<dyn CommandRunner>,
    config: InstallerConfig,
    layout: InstallLayout,
    store: StateStore,
    state: PipelineState,
}

impl Installer {
    /// Create the install directory layout and load any persisted state.
    pub fn new(runner: Arc<dyn CommandRunner>, config: InstallerConfig) -> InstallResult<Self> {
        let layout = InstallLayout::new(&config.install_dir);
        layout
            .ensure_dirs()
            .map_err(|e| InstallError::io(layout.root(), e))?;
        let store = StateStore::new(layout.state_file());
        let state = store.load_or_default(layout.root(), config.max_retries);
        Ok(Self {
            runner,
            config,
            layout,
            store,
            state,
        })
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    fn persist(&self) -> InstallResult<()> {
        self.store.save(&self.state)
    }

    fn reload(&mut self) {
        self.state = self
            .store
            .load_or_default(self.layout.root(), self.config.max_retries);
    }

    /// Run the pipeline. Returns `true` when every component ends in
    /// `Success`, `false` when a component failed past its repair.
    ///
    /// Errors are reserved for problems with the pipeline itself: the lock
    /// is held elsewhere or state cannot be persisted.
    pub async fn install_all(&mut self) -> InstallResult<bool> {
        let _lock = StateLock::acquire(&self.layout.lock_file())?;
        self.reload();

        if self.state.all_succeeded() {
            info!("All components already installed, nothing to do");
            return Ok(true);
        }

        self.state.reset_for_new_run(self.config.max_retries);
        self.persist()?;
        info!(
            install_dir = %self.layout.root().display(),
            resume_from = ?self.state.first_incomplete(),
            "Starting installation"
        );

        let system = detect_system_info(self.runner.as_ref()).await;
        let mut hardware = probe_hardware(self.runner.as_ref(), &self.config.hailo).await;
        info!(
            distro = %system.distro_pretty_name,
            kernel = %system.kernel_release,
            arch = %system.arch,
            pcie_device = hardware.pcie_device,
            driver_loaded = hardware.driver_loaded,
            "Host detected"
        );

        for component in ComponentType::ALL {
            if self.state.status(component) == InstallStatus::Success {
                debug!(component = %component, "Already installed, skipping");
                continue;
            }
            if !self.install_component(component, &system, &hardware).await? {
                error!(component = %component, "Installation halted");
                return Ok(false);
            }
            if matches!(component, ComponentType::PcieDriver | ComponentType::HailoRT) {
                hardware = probe_hardware(self.runner.as_ref(), &self.config.hailo).await;
            }
        }

        info!("Installation completed successfully");
        Ok(true)
    }

    /// Attempt one component until it succeeds or its repair fails.
    async fn install_component(
        &mut self,
        component: ComponentType,
        system: &SystemInfo,
        hardware: &HardwareAvailability,
    ) -> InstallResult<bool> {
        let name = component.display_name();
        loop {
            self.state.mark_running(component)?;
            self.persist()?;
            let attempt = self.state.component(component).retry_count + 1;
            info!(component = %component, attempt, "Installing {name}");

            match self.run_stage(component, system, hardware, None).await {
                Ok(()) => {
                    self.state.mark_success(component);
                    self.persist()?;
                    info!(component = %component, "{name} installed successfully");
                    return Ok(true);
                }
                Err(e) => {
                    warn!(component = %component, attempt, error = %e, "{name} install attempt failed");
                    self.state.record_failure(component, e.to_string());
                    self.persist()?;
                    if self.state.component(component).retries_exhausted() {
                        break;
                    }
                }
            }
        }

        let strategy = RepairStrategy::for_component(component);
        self.state.mark_failed(component, None);
        self.persist()?;
        warn!(component = %component, strategy = %strategy, "Retries exhausted, attempting repair");

        match self
            .run_stage(component, system, hardware, Some(strategy))
            .await
        {
            Ok(()) => {
                self.state.mark_recovered(component)?;
                self.persist()?;
                self.state.mark_success(component);
                self.persist()?;
                info!(component = %component, "{name} installed successfully after repair");
                Ok(true)
            }
            Err(e) => {
                self.state
                    .mark_failed(component, Some(format!("repair ({strategy}) failed: {e}")));
                self.persist()?;
                error!(component = %component, error = %e, "{name} repair failed");
                Ok(false)
            }
        }
    }

    /// Run an install attempt, or a repair when `repair` is set, and keep
    /// the version and rollback data it recorded.
    async fn run_stage(
        &mut self,
        component: ComponentType,
        system: &SystemInfo,
        hardware: &HardwareAvailability,
        repair: Option<RepairStrategy>,
    ) -> StageResult<()> {
        let mut entry = self.state.component(component).clone();
        let ctx = StageContext {
            runner: self.runner.clone(),
            config: &self.config,
            layout: &self.layout,
            system,
            hardware,
        };
        let result = match repair {
            None => stages::install(component, &ctx, &mut entry).await,
            Some(strategy) => strategy.attempt(&ctx, &mut entry).await,
        };

        let target = self.state.component_mut(component);
        target.version = entry.version;
        target.rollback_data = entry.rollback_data;
        result
    }

    /// Revert the host and return every component to `Pending`.
    ///
    /// Host steps are best effort; the returned summary counts failures.
    pub async fn rollback_installation(&mut self) -> InstallResult<RollbackSummary> {
        let _lock = StateLock::acquire(&self.layout.lock_file())?;
        self.reload();
        warn!(install_dir = %self.layout.root().display(), "Rolling back installation");

        for component in ComponentType::ALL {
            self.state.mark_rollback(component);
            self.persist()?;
        }

        let summary = revert_host(self.runner.as_ref(), &self.config, &self.state).await;

        self.state.reset_all();
        self.persist()?;
        info!(
            attempted = summary.attempted,
            failed = summary.failed,
            "Rollback finished"
        );
        Ok(summary)
    }
}
