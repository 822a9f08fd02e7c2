//! `hailo8 test`: run the validation checks and write a report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use hailo8_core::paths::TEST_REPORT_FILE_NAME;
use hailo8_runtime::ValidationTester;

use crate::bootstrap::CliContext;
use crate::presentation::print_report;

pub async fn execute(ctx: &CliContext, quick: bool, report: Option<PathBuf>) -> Result<bool> {
    let tester = ValidationTester::new(ctx.runner.clone(), &ctx.config);
    let result = tester.run(quick).await;
    print_report(&result);

    let path = report.unwrap_or_else(|| PathBuf::from(TEST_REPORT_FILE_NAME));
    result
        .write_to(&path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    println!("Report written to {}", path.display());
    Ok(result.passed())
}
