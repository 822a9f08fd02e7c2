//! Docker engine, daemon config, runtime image and container smoke test.
//!
//! Rollback data:
//! - `installed_engine`: Docker was installed by this stage
//! - `daemon_config_backup`: copy of the daemon config that was replaced
//! - `daemon_config_created`: there was no daemon config before
//!
//! Each value is recorded as soon as its step has run, so a later failing
//! step still leaves enough behind for rollback.

use hailo8_core::{InstallComponent, StageError, StageResult};

use crate::docker::{DockerError, DockerManager};
use crate::installer::context::StageContext;

fn docker_error(e: DockerError) -> StageError {
    StageError::Docker(e.to_string())
}

pub async fn install(ctx: &StageContext<'_>, component: &mut InstallComponent) -> StageResult<()> {
    let manager = DockerManager::new(ctx.runner.clone(), ctx.config);

    let installed_engine = manager
        .ensure_docker(ctx.system.distro_family)
        .await
        .map_err(docker_error)?;
    // An engine installed by an earlier attempt is already present now.
    if installed_engine || !component.is_recorded("installed_engine") {
        component.record("installed_engine", installed_engine);
    }

    if !component.is_recorded("daemon_config_backup")
        && !component.is_recorded("daemon_config_created")
    {
        match manager.backup_daemon_config().map_err(docker_error)? {
            Some(backup) => component.record("daemon_config_backup", backup.display().to_string()),
            None => component.record("daemon_config_created", true),
        }
    }
    manager.write_daemon_config().await.map_err(docker_error)?;

    manager
        .build_image(&ctx.packages_dir())
        .await
        .map_err(docker_error)?;
    manager.test_container().await.map_err(docker_error)?;

    component.version = manager.image_name().to_string();
    Ok(())
}
