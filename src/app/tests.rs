use super::*;
use crate::config::ProxwatchConfig;
use crate::error::ProxwatchError;
use crate::hal::{HardwareBackend, Rgb};
use std::time::Duration;
use tempfile::TempDir;

fn create_test_config(dir: &TempDir) -> ProxwatchConfig {
    let mut config = ProxwatchConfig::default();
    config.system.simulation = true;
    config.system.audit_log_path = dir
        .path()
        .join("distance_log.txt")
        .to_string_lossy()
        .into_owned();
    config.sensor.poll_interval_ms = 50;
    config.sensor.settle_ms = 0;
    config.display.led_count = 2;
    config
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator =
        ProxwatchOrchestrator::new(create_test_config(&dir), HardwareBackend::Simulated).unwrap();

    assert!(orchestrator.backend().is_simulated());
    let states = orchestrator.get_all_component_states().await;
    assert!(states.is_empty());
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator =
        ProxwatchOrchestrator::new(create_test_config(&dir), HardwareBackend::Simulated).unwrap();

    orchestrator.initialize().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.len(), COMPONENTS.len());
    for component in COMPONENTS {
        assert_eq!(
            orchestrator.get_component_state(component).await,
            Some(ComponentState::Stopped)
        );
    }
}

#[tokio::test]
async fn test_component_state_management() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator =
        ProxwatchOrchestrator::new(create_test_config(&dir), HardwareBackend::Simulated).unwrap();

    orchestrator
        .set_component_state("alarm", ComponentState::Starting)
        .await;
    assert_eq!(
        orchestrator.get_component_state("alarm").await,
        Some(ComponentState::Starting)
    );

    orchestrator
        .set_component_state("alarm", ComponentState::Running)
        .await;
    assert_eq!(
        orchestrator.get_component_state("alarm").await,
        Some(ComponentState::Running)
    );
    assert_eq!(orchestrator.get_component_state("unknown").await, None);
}

#[tokio::test]
async fn test_missing_hardware_is_fatal_outside_simulation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&dir);
    config.display.spi_device = "/nonexistent/spidev1.0".to_string();
    config.transport.uart_port = "/nonexistent/serial0".to_string();
    config.transport.spi_device = "/nonexistent/spidev0.0".to_string();

    assert!(ProxwatchOrchestrator::new(config, HardwareBackend::Real).is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_building() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = create_test_config(&dir);
    config.system.history_size = 0;
    let result = ProxwatchOrchestrator::new(config, HardwareBackend::Simulated);
    assert!(matches!(result, Err(ProxwatchError::Config(_))));

    let mut config = create_test_config(&dir);
    config.system.event_bus_capacity = 0;
    let result = ProxwatchOrchestrator::new(config, HardwareBackend::Simulated);
    assert!(matches!(result, Err(ProxwatchError::Config(_))));

    let mut config = create_test_config(&dir);
    config.alarm.critical_threshold_cm = config.alarm.alert_threshold_cm;
    let result = ProxwatchOrchestrator::new(config, HardwareBackend::Simulated);
    assert!(matches!(result, Err(ProxwatchError::Config(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_and_shutdown_in_simulation() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir);
    let audit_path = config.system.audit_log_path.clone();
    let mut orchestrator = ProxwatchOrchestrator::new(config, HardwareBackend::Simulated).unwrap();

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    for component in COMPONENTS {
        assert_eq!(
            orchestrator.get_component_state(component).await,
            Some(ComponentState::Running),
            "{} should be running",
            component
        );
    }
    assert!(orchestrator.display.is_running());
    assert!(orchestrator.alarm.is_running());

    tokio::time::sleep(Duration::from_millis(400)).await;

    // Simulated readings sit in 30..=50 cm
    let history = orchestrator.telemetry_state().history();
    assert!(!history.is_empty());
    assert!(history.iter().all(|d| (30.0..=50.0).contains(d)));

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);

    for component in COMPONENTS {
        assert_eq!(
            orchestrator.get_component_state(component).await,
            Some(ComponentState::Stopped),
            "{} should be stopped",
            component
        );
    }
    assert!(!orchestrator.display.is_running());
    assert!(!orchestrator.alarm.is_running());
    assert!(orchestrator
        .display
        .last_frame()
        .iter()
        .all(|p| *p == Rgb::OFF));

    let audit = std::fs::read_to_string(audit_path).unwrap();
    assert!(audit.lines().count() >= 1);
    assert!(audit.lines().all(|l| l.contains(": Object detected at ")));
}

#[test]
fn test_shutdown_reason_display() {
    assert_eq!(
        ShutdownReason::Signal("SIGTERM".to_string()).to_string(),
        "signal SIGTERM"
    );
    assert_eq!(
        ShutdownReason::Error("monitor loop exited".to_string()).to_string(),
        "error: monitor loop exited"
    );
}
