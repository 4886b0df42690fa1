use crate::error::Result;
use crate::history::{DistanceHistory, NO_READING_CM};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

/// Active LED visualization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Normal,
    History,
    Directional,
}

impl DisplayMode {
    /// Next mode in the rotation, wrapping back to `Normal`
    pub fn next(self) -> Self {
        match self {
            DisplayMode::Normal => DisplayMode::History,
            DisplayMode::History => DisplayMode::Directional,
            DisplayMode::Directional => DisplayMode::Normal,
        }
    }

    /// Value carried in the `m` field of the status packet
    pub fn wire_value(self) -> u8 {
        match self {
            DisplayMode::Normal => 0,
            DisplayMode::History => 1,
            DisplayMode::Directional => 2,
        }
    }
}

/// State of the most recent telemetry send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    Idle,
    Sending,
    Error,
}

/// Distance reported by one sensor position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalReading {
    pub sensor_id: u32,
    pub distance_cm: f64,
}

/// Everything the renderers and transport need to know about the present
#[derive(Debug, Clone)]
pub struct TelemetryState {
    pub latest_distance: f64,
    pub history: DistanceHistory,
    pub mode: DisplayMode,
    pub last_mode_switch: Instant,
    pub directional: Vec<DirectionalReading>,
    pub channel_status: ChannelStatus,
}

impl TelemetryState {
    pub fn new(history_size: usize) -> Result<Self> {
        Ok(Self {
            latest_distance: NO_READING_CM,
            history: DistanceHistory::new(history_size)?,
            mode: DisplayMode::Normal,
            last_mode_switch: Instant::now(),
            directional: Vec::new(),
            channel_status: ChannelStatus::Idle,
        })
    }
}

/// Lock-guarded handle to the single live telemetry record.
///
/// Writers are partitioned by field: the monitor loop owns distance, history
/// and directional data, the animation engine owns mode and rotation time,
/// the transport owns channel status. Locks are never held across an await.
#[derive(Clone)]
pub struct SharedTelemetryState {
    inner: Arc<RwLock<TelemetryState>>,
}

impl SharedTelemetryState {
    pub fn new(history_size: usize) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(RwLock::new(TelemetryState::new(history_size)?)),
        })
    }

    /// Fold a fresh reading into latest, history and directional data
    pub fn record_reading(&self, distance_cm: f64) {
        let mut state = self.inner.write();
        state.latest_distance = distance_cm;
        state.history.push(distance_cm);
        state.directional = vec![DirectionalReading {
            sensor_id: 0,
            distance_cm,
        }];
    }

    /// Advance to the next display mode and stamp the switch time
    pub fn rotate_mode(&self, now: Instant) -> DisplayMode {
        let mut state = self.inner.write();
        state.mode = state.mode.next();
        state.last_mode_switch = now;
        state.mode
    }

    pub fn set_channel_status(&self, status: ChannelStatus) {
        self.inner.write().channel_status = status;
    }

    pub fn latest_distance(&self) -> f64 {
        self.inner.read().latest_distance
    }

    pub fn mode(&self) -> DisplayMode {
        self.inner.read().mode
    }

    pub fn last_mode_switch(&self) -> Instant {
        self.inner.read().last_mode_switch
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.inner.read().channel_status
    }

    pub fn history(&self) -> Vec<f64> {
        self.inner.read().history.to_vec()
    }

    /// Consistent copy of the whole record
    pub fn snapshot(&self) -> TelemetryState {
        self.inner.read().clone()
    }
}
