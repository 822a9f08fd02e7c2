//! End-to-end pipeline behavior against a scripted host.
//!
//! Covers ordering, idempotence, resumability, the retry bound, repair,
//! rollback and state persistence.

mod common;

use common::{LogBuffer, TestHost};
use hailo8_core::ports::CommandOutput;
use hailo8_core::testing::ScriptedRunner;
use hailo8_core::{ComponentType, InstallLayout, InstallStatus, PipelineState};
use hailo8_runtime::StateStore;

fn saved_state(host: &TestHost) -> PipelineState {
    let layout = InstallLayout::new(&host.config.install_dir);
    StateStore::new(layout.state_file())
        .load(layout.root(), host.config.max_retries)
        .expect("State file should exist")
}

#[tokio::test]
async fn test_all_components_succeed() {
    let host = TestHost::healthy();
    let mut installer = host.installer();

    assert!(installer.install_all().await.expect("install_all failed"));

    for component in ComponentType::ALL {
        assert_eq!(
            installer.state().status(component),
            InstallStatus::Success,
            "{component} should succeed"
        );
    }
    let saved = saved_state(&host);
    assert!(saved.all_succeeded());
    assert_eq!(saved.component(ComponentType::PcieDriver).version, "4.23.0");
}

#[tokio::test]
async fn test_success_is_logged_once_per_component() {
    let host = TestHost::healthy();
    let (logs, _guard) = LogBuffer::capture();

    assert!(host.installer().install_all().await.expect("install_all failed"));

    let lines = logs.lines();
    let successes: Vec<_> = lines
        .iter()
        .filter(|line| line.contains(" installed successfully"))
        .collect();
    assert_eq!(successes.len(), ComponentType::ALL.len(), "{successes:#?}");
    for component in ComponentType::ALL {
        let needle = format!("{} installed successfully", component.display_name());
        assert_eq!(
            successes.iter().filter(|line| line.contains(&needle)).count(),
            1,
            "expected one success line for {component}"
        );
    }
}

#[tokio::test]
async fn test_second_run_after_success_runs_no_commands() {
    let host = TestHost::healthy();
    assert!(host.installer().install_all().await.expect("first run failed"));

    host.runner.clear_calls();
    assert!(host.installer().install_all().await.expect("second run failed"));
    assert_eq!(host.runner.call_count(), 0);
}

#[tokio::test]
async fn test_resume_skips_completed_components() {
    let host = TestHost::healthy();
    let layout = InstallLayout::new(&host.config.install_dir);
    let mut state = PipelineState::new(layout.root(), host.config.max_retries);
    for component in [ComponentType::SystemCheck, ComponentType::Dependencies] {
        state.mark_running(component).expect("transition refused");
        state.mark_success(component);
    }
    std::fs::create_dir_all(layout.root()).expect("Failed to create install dir");
    StateStore::new(layout.state_file())
        .save(&state)
        .expect("Failed to save state");

    let mut installer = host.installer();
    assert!(installer.install_all().await.expect("install_all failed"));

    assert_eq!(host.runner.count_matching(&["apt", "update"]), 0);
    assert_eq!(host.runner.count_matching(&["dpkg-query"]), 0);
    assert!(host.first_call("modprobe hailo_pci").is_some());
}

#[tokio::test]
async fn test_dependencies_failing_halts_pipeline() {
    let runner = ScriptedRunner::healthy_host();
    runner.on(&["apt", "update"], CommandOutput::failed("E: Could not resolve host"));
    let host = TestHost::with_runner(runner);
    let mut installer = host.installer();

    assert!(!installer.install_all().await.expect("install_all failed"));

    let deps = installer.state().component(ComponentType::Dependencies);
    assert_eq!(deps.status, InstallStatus::Failed);
    assert_eq!(deps.retry_count, 3);
    assert!(deps.error_msg.contains("Could not resolve host"));

    // Three attempts plus the re-run inside the single repair.
    assert_eq!(host.runner.count_matching(&["apt", "update"]), 4);
    assert_eq!(host.runner.count_matching(&["apt", "--fix-broken"]), 1);

    for later in &ComponentType::ALL[2..] {
        assert_eq!(installer.state().status(*later), InstallStatus::Pending);
    }
    assert_eq!(host.runner.count_matching(&["dpkg", "-i"]), 0);

    let saved = saved_state(&host);
    assert_eq!(saved.status(ComponentType::Dependencies), InstallStatus::Failed);
    assert_eq!(saved.status(ComponentType::SystemCheck), InstallStatus::Success);
}

#[tokio::test]
async fn test_pcie_driver_recovers_through_repair() {
    let runner = ScriptedRunner::healthy_host();
    runner.on_sequence(
        &["modprobe"],
        vec![
            CommandOutput::failed("modprobe: FATAL: Module hailo_pci not found"),
            CommandOutput::failed("modprobe: FATAL: Module hailo_pci not found"),
            CommandOutput::failed("modprobe: FATAL: Module hailo_pci not found"),
        ],
        CommandOutput::ok(""),
    );
    let host = TestHost::with_runner(runner);
    let mut installer = host.installer();

    assert!(installer.install_all().await.expect("install_all failed"));

    let driver = installer.state().component(ComponentType::PcieDriver);
    assert_eq!(driver.status, InstallStatus::Success);
    assert_eq!(driver.retry_count, 3);
    assert!(driver.error_msg.is_empty());
    assert_eq!(host.runner.count_matching(&["dkms", "autoinstall"]), 1);
    assert_eq!(
        installer.state().status(ComponentType::HailoRT),
        InstallStatus::Success
    );

    let dkms = host.first_call("dkms autoinstall").expect("dkms not run");
    let pip = host.first_call("pip3 install").expect("pip3 not run");
    assert!(dkms < pip, "HailoRT must run after the driver repair");
}

#[tokio::test]
async fn test_missing_docker_is_installed_and_pipeline_continues() {
    let runner = ScriptedRunner::healthy_host();
    runner.on(&["which", "docker"], CommandOutput::failed(""));
    let host = TestHost::with_runner(runner);
    let mut installer = host.installer();

    assert!(installer.install_all().await.expect("install_all failed"));

    assert_eq!(
        host.runner
            .count_matching(&["apt-get", "install", "-y", "docker-ce"]),
        1
    );
    let docker = installer.state().component(ComponentType::DockerConfig);
    assert_eq!(docker.rollback_data["installed_engine"], serde_json::json!(true));
    assert_eq!(host.runner.count_matching(&["docker", "build"]), 1);
}

#[tokio::test]
async fn test_docker_install_failure_skips_image_build() {
    let runner = ScriptedRunner::healthy_host();
    runner
        .on(&["which", "docker"], CommandOutput::failed(""))
        .on(&["apt-get", "install"], CommandOutput::failed("E: Unable to locate package docker-ce"));
    let host = TestHost::with_runner(runner);
    let mut installer = host.installer();

    assert!(!installer.install_all().await.expect("install_all failed"));

    assert_eq!(
        installer.state().status(ComponentType::DockerConfig),
        InstallStatus::Failed
    );
    assert_eq!(
        installer.state().status(ComponentType::Validation),
        InstallStatus::Pending
    );
    assert_eq!(host.runner.count_matching(&["docker", "build"]), 0);
}

#[tokio::test]
async fn test_rollback_resets_every_component() {
    let runner = ScriptedRunner::healthy_host();
    // Hardware detection, the driver snapshot and the loaded-before check
    // see no module.
    let unloaded = CommandOutput::ok("Module  Size  Used by\nsnd  1  0\n");
    runner.on_sequence(
        &["lsmod"],
        vec![unloaded.clone(), unloaded.clone(), unloaded],
        CommandOutput::ok("Module  Size  Used by\nhailo_pci  118784  0\n"),
    );
    let host = TestHost::with_runner(runner);
    let mut installer = host.installer();
    assert!(installer.install_all().await.expect("install_all failed"));

    let summary = installer
        .rollback_installation()
        .await
        .expect("rollback failed");
    assert!(summary.clean());

    for entry in saved_state(&host).components() {
        assert_eq!(entry.status, InstallStatus::Pending);
        assert_eq!(entry.retry_count, 0);
        assert!(entry.error_msg.is_empty());
        assert!(entry.rollback_data.is_empty());
        assert!(entry.version.is_empty());
    }
    assert_eq!(host.runner.count_matching(&["dpkg", "-r", "hailort"]), 1);
    assert_eq!(host.runner.count_matching(&["rmmod", "hailo_pci"]), 1);
}

#[tokio::test]
async fn test_rollback_after_failed_docker_retries_restores_original_daemon_config() {
    let runner = ScriptedRunner::healthy_host();
    runner.on(&["docker", "build"], CommandOutput::failed("failed to solve: network unreachable"));
    let host = TestHost::with_runner(runner);
    let daemon = &host.config.docker.daemon_config_path;
    std::fs::create_dir_all(daemon.parent().expect("daemon config has a parent"))
        .expect("Failed to create docker dir");
    std::fs::write(daemon, r#"{"log-driver": "journald"}"#).expect("Failed to write daemon config");

    let mut installer = host.installer();
    assert!(!installer.install_all().await.expect("install_all failed"));
    assert_eq!(
        installer.state().status(ComponentType::DockerConfig),
        InstallStatus::Failed
    );
    // Three attempts plus the re-run inside the repair.
    assert_eq!(host.runner.count_matching(&["docker", "build"]), 4);

    let summary = installer
        .rollback_installation()
        .await
        .expect("rollback failed");
    assert!(summary.clean());
    assert_eq!(
        std::fs::read_to_string(daemon).expect("daemon config missing"),
        r#"{"log-driver": "journald"}"#
    );
}

#[tokio::test]
async fn test_rollback_keeps_module_that_was_loaded_before_install() {
    let host = TestHost::healthy();
    let mut installer = host.installer();
    assert!(installer.install_all().await.expect("install_all failed"));

    // The scripted host reports the module loaded before the driver stage ran.
    installer
        .rollback_installation()
        .await
        .expect("rollback failed");
    assert_eq!(host.runner.count_matching(&["rmmod"]), 0);
}

#[tokio::test]
async fn test_state_round_trip_preserves_progress() {
    let host = TestHost::healthy();
    let layout = InstallLayout::new(&host.config.install_dir);
    let mut state = PipelineState::new(layout.root(), 3);
    state.mark_running(ComponentType::SystemCheck).expect("transition refused");
    state.mark_success(ComponentType::SystemCheck);
    state.mark_running(ComponentType::Dependencies).expect("transition refused");
    state.record_failure(ComponentType::Dependencies, "apt update failed");
    state.record_failure(ComponentType::Dependencies, "apt update failed again");

    let store = StateStore::new(layout.state_file());
    store.save(&state).expect("Failed to save state");
    let loaded = store.load(layout.root(), 3).expect("State should load");

    for (before, after) in state.components().zip(loaded.components()) {
        assert_eq!(before.status, after.status);
        assert_eq!(before.retry_count, after.retry_count);
        assert_eq!(before.error_msg, after.error_msg);
    }
    assert_eq!(
        loaded.component(ComponentType::Dependencies).error_msg,
        "apt update failed again"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_second_instance_is_locked_out() {
    use hailo8_core::InstallError;
    use hailo8_runtime::StateLock;

    let host = TestHost::healthy();
    let mut installer = host.installer();
    let _held = StateLock::acquire(&installer.layout().lock_file()).expect("lock failed");

    let err = installer.install_all().await.unwrap_err();
    assert!(matches!(err, InstallError::Locked(_)));
    assert_eq!(host.runner.call_count(), 0);
}
