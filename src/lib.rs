pub mod alarm;
pub mod app;
pub mod audit;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod hal;
pub mod history;
pub mod monitor;
pub mod sensor;
pub mod state;
pub mod transport;

pub use alarm::{AlarmEngine, AlarmSeverity};
pub use app::{ComponentState, ProxwatchOrchestrator, ShutdownReason};
pub use audit::AuditLog;
pub use config::ProxwatchConfig;
pub use display::AnimationEngine;
pub use error::{ProxwatchError, Result};
pub use events::{EventBus, EventFilter, EventHandler, EventReceiver, ProxwatchEvent};
pub use hal::HardwareBackend;
pub use history::DistanceHistory;
pub use monitor::{CycleOutcome, ProximityMonitor};
pub use sensor::DistanceSensor;
pub use state::{ChannelStatus, DisplayMode, SharedTelemetryState, TelemetryState};
pub use transport::{StatusIndicator, TelemetryTransport};
