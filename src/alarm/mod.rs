mod engine;
mod severity;

pub use engine::{AlarmEngine, ALARM_JOIN_TIMEOUT};
pub use severity::{AlarmSeverity, BeepPattern, IDLE_POLL};
