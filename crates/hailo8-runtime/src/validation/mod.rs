//! Diagnostic check battery.
//!
//! Checks are independent, never retried and never touch install state.
//! They can be run at any time, before or after an install.

mod report;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use futures_util::future::join_all;
use hailo8_core::ports::{CommandOutput, CommandRunner, CommandSpec};
use hailo8_core::InstallerConfig;
use tracing::{info, warn};

pub use report::{CheckOutcome, CheckResult, ValidationReport};

use crate::docker::DockerManager;
use crate::system::{
    command_exists, detect_system_info, module_loaded, pcie_device_visible, present_device_nodes,
};

/// Concurrent scans in the stress probe.
pub const STRESS_WORKERS: usize = 5;

/// Scans that must succeed for the stress probe to pass.
pub const STRESS_MIN_SUCCESSES: usize = 4;

const VERSION_SCRIPT: &str = "import hailo_platform; print(hailo_platform.__version__)";

const SCAN_SCRIPT: &str = "import sys
from hailo_platform import Device
devices = Device.scan()
print(len(devices))
sys.exit(0 if devices else 1)";

const SCAN_ARGV: [&str; 3] = ["python3", "-c", SCAN_SCRIPT];

const CONTAINER_IMPORT_SCRIPT: &str = "import hailo_platform; print('ok')";

/// Runs the check battery.
pub struct ValidationTester {
    runner: Arc<dyn CommandRunner>,
    config: InstallerConfig,
}

impl ValidationTester {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &InstallerConfig) -> Self {
        Self {
            runner,
            config: config.clone(),
        }
    }

    async fn run_cmd(&self, argv: &[&str], timeout: Duration) -> CommandOutput {
        self.runner
            .run(&CommandSpec::from_argv(argv).timeout(timeout))
            .await
    }

    /// Run every check. `quick` skips the stress probe.
    pub async fn run(&self, quick: bool) -> ValidationReport {
        let started_at = Local::now();
        info!(quick, "Starting validation");

        let mut checks = vec![
            timed("system_info", self.check_system_info()).await,
            timed("driver_module", self.check_driver_module()).await,
            timed("device_node", self.check_device_node()).await,
            timed("runtime_library", self.check_runtime_library()).await,
            timed("docker_integration", self.check_docker()).await,
            timed("performance_probe", self.check_performance()).await,
        ];
        if quick {
            checks.push(CheckResult {
                name: "stress_probe",
                outcome: CheckOutcome::Skipped,
                detail: "skipped in quick mode".to_string(),
                duration: Duration::ZERO,
            });
        } else {
            checks.push(timed("stress_probe", self.check_stress()).await);
        }

        for check in &checks {
            match check.outcome {
                CheckOutcome::Failed => {
                    warn!(check = check.name, detail = %check.detail, "Check failed");
                }
                outcome => info!(check = check.name, outcome = outcome.label(), detail = %check.detail, "Check finished"),
            }
        }

        let report = ValidationReport {
            started_at,
            quick,
            checks,
        };
        info!(
            passed = report.passed(),
            failed = report.count(CheckOutcome::Failed),
            "Validation finished"
        );
        report
    }

    async fn check_system_info(&self) -> (CheckOutcome, String) {
        let info = detect_system_info(self.runner.as_ref()).await;
        if info.kernel_release == "unknown" && info.distro_id == "unknown" {
            return (
                CheckOutcome::Failed,
                "unable to read system information".to_string(),
            );
        }
        (
            CheckOutcome::Passed,
            format!(
                "{} {} kernel {} ({})",
                info.distro_id, info.distro_version, info.kernel_release, info.arch
            ),
        )
    }

    async fn check_driver_module(&self) -> (CheckOutcome, String) {
        let runner = self.runner.as_ref();
        let hailo = &self.config.hailo;
        let on_bus = pcie_device_visible(runner, &hailo.pcie_vendor_id).await;
        let bus_note = if on_bus {
            "device on PCIe bus"
        } else {
            "no device on PCIe bus"
        };
        if module_loaded(runner, &hailo.driver_module).await {
            (
                CheckOutcome::Passed,
                format!("{} loaded, {bus_note}", hailo.driver_module),
            )
        } else {
            (
                CheckOutcome::Failed,
                format!("{} not loaded, {bus_note}", hailo.driver_module),
            )
        }
    }

    async fn check_device_node(&self) -> (CheckOutcome, String) {
        let nodes = present_device_nodes(&self.config.hailo);
        if nodes.is_empty() {
            let expected: Vec<String> = self
                .config
                .hailo
                .device_nodes
                .iter()
                .map(|n| n.display().to_string())
                .collect();
            (
                CheckOutcome::Failed,
                format!("none of {} exist", expected.join(", ")),
            )
        } else {
            let found: Vec<String> = nodes.iter().map(|n| n.display().to_string()).collect();
            (CheckOutcome::Passed, format!("found {}", found.join(", ")))
        }
    }

    async fn check_runtime_library(&self) -> (CheckOutcome, String) {
        let timeout = self.config.timeouts.probe();
        let cli_note = if command_exists(self.runner.as_ref(), "hailortcli").await {
            "hailortcli present"
        } else {
            "hailortcli missing"
        };

        let version = self
            .run_cmd(&["python3", "-c", VERSION_SCRIPT], timeout)
            .await;
        if !version.success() {
            return (
                CheckOutcome::Failed,
                format!("hailo_platform import failed: {}", version.failure_reason()),
            );
        }

        let scan = self.run_cmd(&SCAN_ARGV, timeout).await;
        if !scan.success() {
            return (
                CheckOutcome::Failed,
                format!("device scan failed: {}", scan.failure_reason()),
            );
        }
        (
            CheckOutcome::Passed,
            format!(
                "hailo_platform {}, {} device(s), {cli_note}",
                version.stdout.trim(),
                scan.stdout.trim()
            ),
        )
    }

    async fn check_docker(&self) -> (CheckOutcome, String) {
        let quick = self.config.timeouts.quick();
        if !self.run_cmd(&["which", "docker"], quick).await.success() {
            return (CheckOutcome::Skipped, "Docker not installed".to_string());
        }

        let active = self
            .run_cmd(&["systemctl", "is-active", "docker"], quick)
            .await;
        if active.stdout.trim() != "active" {
            return (
                CheckOutcome::Failed,
                format!("Docker service is not active ({})", active.stdout.trim()),
            );
        }

        let image = &self.config.docker.image_name;
        let images = self
            .run_cmd(&["docker", "images", "-q", image], self.config.timeouts.probe())
            .await;
        if !images.success() || images.stdout.trim().is_empty() {
            return (
                CheckOutcome::Skipped,
                format!("image {image} not built"),
            );
        }

        let manager = DockerManager::new(self.runner.clone(), &self.config);
        let mut argv = vec!["docker", "run", "--rm"];
        let devices = manager.device_args();
        argv.extend(devices.iter().map(String::as_str));
        argv.extend([image.as_str(), "python3", "-c", CONTAINER_IMPORT_SCRIPT]);

        let run = self
            .run_cmd(&argv, self.config.timeouts.container_test())
            .await;
        if run.success() {
            (
                CheckOutcome::Passed,
                format!("hailo_platform imports inside {image}"),
            )
        } else {
            (
                CheckOutcome::Failed,
                format!("container test failed: {}", run.failure_reason()),
            )
        }
    }

    async fn check_performance(&self) -> (CheckOutcome, String) {
        let started = Instant::now();
        let scan = self
            .run_cmd(&SCAN_ARGV, self.config.timeouts.container_test())
            .await;
        let elapsed = started.elapsed();
        if scan.success() {
            (
                CheckOutcome::Passed,
                format!("device scan took {:.2}s", elapsed.as_secs_f64()),
            )
        } else {
            (
                CheckOutcome::Failed,
                format!("device scan failed: {}", scan.failure_reason()),
            )
        }
    }

    async fn check_stress(&self) -> (CheckOutcome, String) {
        let timeout = self.config.timeouts.probe();
        let scans = (0..STRESS_WORKERS).map(|_| self.run_cmd(&SCAN_ARGV, timeout));
        let successes = join_all(scans)
            .await
            .iter()
            .filter(|out| out.success())
            .count();

        let detail = format!("{successes}/{STRESS_WORKERS} concurrent scans succeeded");
        if successes >= STRESS_MIN_SUCCESSES {
            (CheckOutcome::Passed, detail)
        } else {
            (CheckOutcome::Failed, detail)
        }
    }
}

async fn timed<F>(name: &'static str, check: F) -> CheckResult
where
    F: Future<Output = (CheckOutcome, String)>,
{
    let started = Instant::now();
    let (outcome, detail) = check.await;
    CheckResult {
        name,
        outcome,
        detail,
        duration: started.elapsed(),
    }
}
