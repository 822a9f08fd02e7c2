//! Validation results and the plain-text report.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed,
    /// Not applicable on this host or disabled for this run.
    Skipped,
}

impl CheckOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Skipped => "SKIP",
        }
    }
}

/// One named check and what it found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub outcome: CheckOutcome,
    pub detail: String,
    pub duration: Duration,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.outcome != CheckOutcome::Failed
    }
}

/// All checks of one validation run.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub started_at: DateTime<Local>,
    pub quick: bool,
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    /// True when no check failed. Skipped checks do not count against it.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(CheckResult::passed)
    }

    pub fn count(&self, outcome: CheckOutcome) -> usize {
        self.checks.iter().filter(|c| c.outcome == outcome).count()
    }

    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| c.outcome == CheckOutcome::Failed)
            .map(|c| c.name)
            .collect()
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Render the report file contents.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Hailo8 Validation Report");
        let _ = writeln!(out, "========================");
        let _ = writeln!(
            out,
            "Test time: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(
            out,
            "Mode: {}",
            if self.quick { "quick" } else { "full" }
        );
        let _ = writeln!(out);

        for check in &self.checks {
            let _ = writeln!(
                out,
                "[{}] {:<20} {:>7.2}s  {}",
                check.outcome.label(),
                check.name,
                check.duration.as_secs_f64(),
                check.detail
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Total: {} checks, {} passed, {} failed, {} skipped",
            self.checks.len(),
            self.count(CheckOutcome::Passed),
            self.count(CheckOutcome::Failed),
            self.count(CheckOutcome::Skipped)
        );
        let _ = writeln!(
            out,
            "Result: {}",
            if self.passed() {
                "ALL CHECKS PASSED"
            } else {
                "SOME CHECKS FAILED"
            }
        );
        out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &'static str, outcome: CheckOutcome) -> CheckResult {
        CheckResult {
            name,
            outcome,
            detail: format!("{name} detail"),
            duration: Duration::from_millis(120),
        }
    }

    fn report(checks: Vec<CheckResult>) -> ValidationReport {
        ValidationReport {
            started_at: Local::now(),
            quick: true,
            checks,
        }
    }

    #[test]
    fn skipped_checks_do_not_fail_the_run() {
        let report = report(vec![
            check("driver_module", CheckOutcome::Passed),
            check("docker_integration", CheckOutcome::Skipped),
        ]);
        assert!(report.passed());
        assert!(report.failed_checks().is_empty());
    }

    #[test]
    fn one_failure_fails_the_run() {
        let report = report(vec![
            check("driver_module", CheckOutcome::Passed),
            check("device_node", CheckOutcome::Failed),
        ]);
        assert!(!report.passed());
        assert_eq!(report.failed_checks(), vec!["device_node"]);
    }

    #[test]
    fn text_report_lists_every_check_and_verdict() {
        let report = report(vec![
            check("driver_module", CheckOutcome::Passed),
            check("device_node", CheckOutcome::Failed),
            check("stress_probe", CheckOutcome::Skipped),
        ]);
        let text = report.render_text();
        assert!(text.contains("[PASS] driver_module"));
        assert!(text.contains("[FAIL] device_node"));
        assert!(text.contains("[SKIP] stress_probe"));
        assert!(text.contains("Total: 3 checks, 1 passed, 1 failed, 1 skipped"));
        assert!(text.contains("SOME CHECKS FAILED"));
    }

    #[test]
    fn writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("hailo8_test_report.txt");
        report(vec![check("system_info", CheckOutcome::Passed)])
            .write_to(&path)
            .unwrap();
        assert!(
            std::fs::read_to_string(path)
                .unwrap()
                .contains("ALL CHECKS PASSED")
        );
    }
}
