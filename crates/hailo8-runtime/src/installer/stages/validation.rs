//! Post-install validation using the quick check battery.

use hailo8_core::paths::TEST_REPORT_FILE_NAME;
use hailo8_core::{InstallComponent, StageError, StageResult};
use tracing::warn;

use crate::installer::context::StageContext;
use crate::validation::ValidationTester;

pub async fn install(ctx: &StageContext<'_>, _component: &mut InstallComponent) -> StageResult<()> {
    let report = ValidationTester::new(ctx.runner.clone(), ctx.config)
        .run(true)
        .await;

    let path = ctx.layout.logs_dir().join(TEST_REPORT_FILE_NAME);
    if let Err(e) = report.write_to(&path) {
        warn!(path = %path.display(), error = %e, "Failed to write validation report");
    }

    if report.passed() {
        Ok(())
    } else {
        Err(StageError::verification(format!(
            "failed checks: {}",
            report.failed_checks().join(", ")
        )))
    }
}
