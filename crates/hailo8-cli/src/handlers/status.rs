//! `hailo8 status`: show persisted component status.

use anyhow::{Context, Result};
use hailo8_core::InstallLayout;
use hailo8_runtime::StateStore;

use crate::bootstrap::CliContext;
use crate::presentation::print_status_table;

/// Read-only: never takes the lock or creates the install directory.
pub fn execute(ctx: &CliContext, json: bool) -> Result<bool> {
    let layout = InstallLayout::new(&ctx.config.install_dir);
    let state = StateStore::new(layout.state_file())
        .load_or_default(layout.root(), ctx.config.max_retries);

    if json {
        let document = serde_json::to_string_pretty(&state.to_document())
            .context("Failed to serialize install state")?;
        println!("{document}");
    } else {
        print_status_table(&state);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hailo8_core::InstallerConfig;
    use hailo8_core::testing::ScriptedRunner;

    #[test]
    fn test_status_does_not_create_install_dir() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join("hailo8");
        let ctx = CliContext {
            config: InstallerConfig {
                install_dir: install_dir.clone(),
                ..InstallerConfig::default()
            },
            runner: Arc::new(ScriptedRunner::succeeding()),
        };

        assert!(execute(&ctx, true).unwrap());
        assert!(!install_dir.exists());
    }
}
