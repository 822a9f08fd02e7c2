//! `hailo8 docker`: standalone Docker environment management.

use anyhow::Result;
use hailo8_runtime::DockerManager;
use hailo8_runtime::system::detect_system_info;

use crate::bootstrap::CliContext;
use crate::commands::{DockerArgs, DockerMode};
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, args: &DockerArgs) -> Result<bool> {
    let manager = DockerManager::new(ctx.runner.clone(), &ctx.config);
    let packages_dir = args
        .packages_dir
        .clone()
        .unwrap_or_else(|| ctx.config.packages_dir());

    match args.mode() {
        DockerMode::Cleanup => {
            let summary = manager.cleanup().await;
            println!(
                "Cleanup: {} steps, {} failed",
                summary.attempted, summary.failed
            );
            Ok(summary.failed == 0)
        }
        DockerMode::BuildOnly => {
            manager
                .build_image(&packages_dir)
                .await
                .map_err(CliError::from)?;
            println!("✓ Image {} built", manager.image_name());
            Ok(true)
        }
        DockerMode::TestOnly => {
            let output = manager.test_container().await.map_err(CliError::from)?;
            println!("{}", output.trim_end());
            println!("✓ Container test passed");
            Ok(true)
        }
        DockerMode::Full => {
            let system = detect_system_info(ctx.runner.as_ref()).await;
            let report = manager
                .setup_complete_docker_environment(system.distro_family, &packages_dir)
                .await
                .map_err(CliError::from)?;
            if report.installed_engine {
                println!("Docker engine installed");
            }
            if let Some(backup) = report.daemon_config_backup {
                println!("Previous daemon config saved to {}", backup.display());
            }
            println!("✓ Docker environment ready ({})", manager.image_name());
            Ok(true)
        }
    }
}
