//! Component status, validation and probe output.

use hailo8_core::{HardwareAvailability, InstallStatus, PipelineState, SystemInfo};
use hailo8_runtime::{CheckOutcome, ValidationReport};

use super::tables::{print_separator, truncate_string, yes_no};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const ERROR_WIDTH: usize = 48;

/// Colored status word.
pub fn status_label(status: InstallStatus) -> String {
    let color = match status {
        InstallStatus::Success | InstallStatus::Recovered => GREEN,
        InstallStatus::Failed => RED,
        InstallStatus::Running | InstallStatus::Rollback => YELLOW,
        InstallStatus::Pending => "",
    };
    format!("{color}{:<10}{RESET}", status.as_str())
}

/// Print one row per component in install order.
pub fn print_status_table(state: &PipelineState) {
    println!("\n{BOLD}Hailo8 installation status{RESET}");
    println!(
        "Install dir: {}   Updated: {}",
        state.install_dir().display(),
        state
            .timestamp()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    print_separator(96);
    println!(
        "{:<20} {:<10} {:<10} {:<7} {}",
        "COMPONENT", "STATUS", "VERSION", "RETRY", "ERROR"
    );
    print_separator(96);
    for entry in state.components() {
        println!(
            "{:<20} {} {:<10} {:<7} {}",
            entry.name,
            status_label(entry.status),
            if entry.version.is_empty() { "-" } else { entry.version.as_str() },
            format!("{}/{}", entry.retry_count, entry.max_retries),
            truncate_string(&entry.error_msg, ERROR_WIDTH)
        );
    }
    print_separator(96);
}

/// Print every check and the verdict.
pub fn print_report(report: &ValidationReport) {
    println!("\n{BOLD}Hailo8 validation{RESET}");
    print_separator(72);
    for check in &report.checks {
        let color = match check.outcome {
            CheckOutcome::Passed => GREEN,
            CheckOutcome::Failed => RED,
            CheckOutcome::Skipped => YELLOW,
        };
        println!(
            "{color}[{}]{RESET} {:<20} {}",
            check.outcome.label(),
            check.name,
            check.detail
        );
    }
    print_separator(72);
    println!(
        "{} passed, {} failed, {} skipped",
        report.count(CheckOutcome::Passed),
        report.count(CheckOutcome::Failed),
        report.count(CheckOutcome::Skipped)
    );
    if report.passed() {
        println!("{GREEN}All checks passed{RESET}");
    } else {
        println!("{RED}Failed: {}{RESET}", report.failed_checks().join(", "));
    }
}

/// Print the host and accelerator probe.
pub fn print_hardware(system: &SystemInfo, hardware: &HardwareAvailability) {
    println!("\n{BOLD}System{RESET}");
    print_separator(40);
    println!("  Distribution:    {}", system.distro_pretty_name);
    println!("  Kernel:          {}", system.kernel_release);
    println!("  Architecture:    {}", system.arch);
    println!(
        "  Package manager: {}",
        system
            .package_manager
            .map_or_else(|| "none".to_string(), |pm| pm.to_string())
    );

    println!("\n{BOLD}Hailo-8{RESET}");
    print_separator(40);
    println!("  PCIe device:     {}", yes_no(hardware.pcie_device));
    println!("  Driver loaded:   {}", yes_no(hardware.driver_loaded));
    let nodes: Vec<String> = hardware
        .device_nodes
        .iter()
        .map(|n| n.display().to_string())
        .collect();
    println!(
        "  Device nodes:    {}",
        if nodes.is_empty() { "none".to_string() } else { nodes.join(", ") }
    );
    println!("  hailortcli:      {}", yes_no(hardware.runtime_cli));
    println!("  Python binding:  {}", yes_no(hardware.python_binding));
    println!("  NVIDIA GPU:      {}", yes_no(hardware.nvidia_gpu));

    if hardware.accelerator_ready() {
        println!("\n{GREEN}✓ Accelerator ready{RESET}");
    } else {
        println!("\n{YELLOW}! Accelerator not ready, run `hailo8 install`{RESET}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label_pads_and_colors() {
        let label = status_label(InstallStatus::Failed);
        assert!(label.starts_with(RED));
        assert!(label.contains("failed    "));
        assert!(label.ends_with(RESET));
    }
}
