use super::types::{ComponentState, ShutdownReason};
use crate::alarm::AlarmEngine;
use crate::config::ProxwatchConfig;
use crate::display::AnimationEngine;
use crate::error::Result;
use crate::events::EventBus;
use crate::hal::HardwareBackend;
use crate::monitor::{ProximityMonitor, Thresholds};
use crate::sensor::build_sensor;
use crate::state::SharedTelemetryState;
use crate::transport::{StatusIndicator, TelemetryTransport};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Components in start order; shutdown walks them in reverse
pub const COMPONENTS: [&str; 6] = ["sensor", "transport", "audit", "display", "alarm", "monitor"];

/// Main application coordinator that owns every component and their tasks
pub struct ProxwatchOrchestrator {
    pub(super) config: ProxwatchConfig,
    pub(super) backend: HardwareBackend,
    pub(super) event_bus: EventBus,
    pub(super) state: SharedTelemetryState,

    // Components
    pub(super) display: Arc<AnimationEngine>,
    pub(super) alarm: Arc<AlarmEngine>,
    pub(super) transport: Arc<TelemetryTransport>,
    pub(super) monitor: Arc<ProximityMonitor>,

    // Background tasks
    pub(super) monitor_task: Option<JoinHandle<()>>,
    pub(super) audit_task: Option<JoinHandle<()>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl ProxwatchOrchestrator {
    /// Build every component on the given backend. Fails on an invalid
    /// configuration or if a required telemetry channel cannot be opened.
    pub fn new(config: ProxwatchConfig, backend: HardwareBackend) -> Result<Self> {
        config.validate()?;
        info!("Building components on {:?} hardware backend", backend);

        let event_bus = EventBus::new(config.system.event_bus_capacity);
        let state = SharedTelemetryState::new(config.system.history_size)?;
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let display = Arc::new(AnimationEngine::from_config(
            backend,
            &config.display,
            config.alarm.alert_threshold_cm,
            state.clone(),
            event_bus.clone(),
        )?);

        let alarm = Arc::new(AlarmEngine::from_config(backend, &config.alarm)?);

        let indicator: Arc<dyn StatusIndicator> = display.clone();
        let transport = Arc::new(TelemetryTransport::setup(
            &config.transport,
            backend,
            state.clone(),
            event_bus.clone(),
            Some(indicator),
        )?);

        let sensor = build_sensor(backend, &config.sensor)?;
        let monitor = Arc::new(ProximityMonitor::new(
            sensor,
            state.clone(),
            Arc::clone(&display),
            Arc::clone(&alarm),
            Arc::clone(&transport),
            event_bus.clone(),
            Thresholds {
                critical_cm: config.alarm.critical_threshold_cm,
                alert_cm: config.alarm.alert_threshold_cm,
            },
            config.sensor.poll_interval(),
        ));

        Ok(Self {
            config,
            backend,
            event_bus,
            state,
            display,
            alarm,
            transport,
            monitor,
            monitor_task: None,
            audit_task: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn backend(&self) -> HardwareBackend {
        self.backend
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn telemetry_state(&self) -> &SharedTelemetryState {
        &self.state
    }
}
