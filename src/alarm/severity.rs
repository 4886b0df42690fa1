use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often the idle alarm task re-reads the severity
pub const IDLE_POLL: Duration = Duration::from_millis(100);

/// Buzzer urgency derived from the latest distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmSeverity {
    Off,
    Warning,
    Critical,
}

/// One on/off beep cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    pub on: Duration,
    pub off: Duration,
}

impl AlarmSeverity {
    /// Map a distance onto a severity. Recomputed from scratch every call,
    /// there is deliberately no hysteresis band.
    pub fn classify(distance_cm: f64, critical_cm: f64, warning_cm: f64) -> Self {
        if distance_cm < critical_cm {
            AlarmSeverity::Critical
        } else if distance_cm < warning_cm {
            AlarmSeverity::Warning
        } else {
            AlarmSeverity::Off
        }
    }

    /// Beep cycle for this severity, `None` when silent
    pub fn pattern(self) -> Option<BeepPattern> {
        match self {
            AlarmSeverity::Off => None,
            AlarmSeverity::Warning => Some(BeepPattern {
                on: Duration::from_millis(300),
                off: Duration::from_millis(700),
            }),
            AlarmSeverity::Critical => Some(BeepPattern {
                on: Duration::from_millis(100),
                off: Duration::from_millis(100),
            }),
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            AlarmSeverity::Off => 0,
            AlarmSeverity::Warning => 1,
            AlarmSeverity::Critical => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            2 => AlarmSeverity::Critical,
            1 => AlarmSeverity::Warning,
            _ => AlarmSeverity::Off,
        }
    }
}
