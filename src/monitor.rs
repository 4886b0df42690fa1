//! The steady-state measurement loop.

use crate::alarm::{AlarmEngine, AlarmSeverity};
use crate::display::AnimationEngine;
use crate::error::{ProxwatchError, Result};
use crate::events::{EventBus, ProxwatchEvent};
use crate::history::{MAX_VALID_CM, NO_READING_CM};
use crate::sensor::DistanceSensor;
use crate::state::SharedTelemetryState;
use crate::transport::TelemetryTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one poll cycle did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Reading above the sensor's range, nothing was updated
    Discarded { raw_cm: f64 },
    Processed {
        distance_cm: f64,
        severity: AlarmSeverity,
        alert: bool,
        sent: bool,
    },
}

/// Alarm and alert thresholds applied every cycle
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub critical_cm: f64,
    pub alert_cm: f64,
}

/// Polls the rangefinder at a fixed cadence and fans each valid reading out
/// to the display, alarm, transport and audit trail
pub struct ProximityMonitor {
    sensor: Arc<Mutex<Box<dyn DistanceSensor>>>,
    state: SharedTelemetryState,
    display: Arc<AnimationEngine>,
    alarm: Arc<AlarmEngine>,
    transport: Arc<TelemetryTransport>,
    event_bus: EventBus,
    thresholds: Thresholds,
    poll_interval: Duration,
}

impl ProximityMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor: Box<dyn DistanceSensor>,
        state: SharedTelemetryState,
        display: Arc<AnimationEngine>,
        alarm: Arc<AlarmEngine>,
        transport: Arc<TelemetryTransport>,
        event_bus: EventBus,
        thresholds: Thresholds,
        poll_interval: Duration,
    ) -> Self {
        Self {
            sensor: Arc::new(Mutex::new(sensor)),
            state,
            display,
            alarm,
            transport,
            event_bus,
            thresholds,
            poll_interval,
        }
    }

    /// Run the sensor's blocking setup off the async runtime
    pub async fn setup_sensor(&self) -> Result<()> {
        let sensor = Arc::clone(&self.sensor);
        tokio::task::spawn_blocking(move || sensor.lock().setup())
            .await
            .map_err(|e| ProxwatchError::component("sensor", format!("setup task failed: {}", e)))?
    }

    pub fn cleanup_sensor(&self) {
        self.sensor.lock().cleanup();
    }

    /// Fold one raw reading into the system
    pub fn process_reading(&self, raw_cm: f64) -> CycleOutcome {
        if raw_cm > MAX_VALID_CM {
            debug!("Ignored outlier distance: {} cm", raw_cm);
            return CycleOutcome::Discarded { raw_cm };
        }

        let distance_cm = raw_cm;
        debug!("Distance: {} cm", distance_cm);

        self.state.record_reading(distance_cm);
        self.display.update_display();

        let severity = AlarmSeverity::classify(
            distance_cm,
            self.thresholds.critical_cm,
            self.thresholds.alert_cm,
        );
        self.alarm.set_severity(severity);

        let alert = distance_cm < self.thresholds.alert_cm;
        if alert {
            self.event_bus.publish(ProxwatchEvent::ProximityAlert {
                distance_cm,
                timestamp: SystemTime::now(),
            });
        }

        let snapshot = self.state.snapshot();
        let sent = self.transport.send_status(
            distance_cm,
            snapshot.mode,
            &snapshot.history.to_vec(),
            alert,
        );

        CycleOutcome::Processed {
            distance_cm,
            severity,
            alert,
            sent,
        }
    }

    /// Measure once on a blocking thread, then process the reading
    pub async fn run_cycle(&self) -> CycleOutcome {
        let sensor = Arc::clone(&self.sensor);
        let raw_cm = match tokio::task::spawn_blocking(move || sensor.lock().measure()).await {
            Ok(raw_cm) => raw_cm,
            Err(e) => {
                warn!("Measurement task failed: {}", e);
                NO_READING_CM
            }
        };

        self.process_reading(raw_cm)
    }

    /// Poll until cancelled. Discarded cycles still wait for the next tick.
    pub async fn run(&self, token: CancellationToken) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Monitor loop polling every {:?}", self.poll_interval);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        info!("Monitor loop stopped");
    }
}
