use super::rangefinder::round_to;
use super::DistanceSensor;
use crate::error::Result;
use crate::hal::{Clock, MonotonicClock};
use tracing::{debug, trace};

/// Rangefinder stand-in producing a slow sine between 30 and 50 cm
pub struct SimulatedRangefinder {
    clock: Box<dyn Clock>,
}

impl SimulatedRangefinder {
    pub fn new() -> Self {
        Self::with_clock(Box::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Synthetic distance at `t` seconds
    pub fn distance_at(t: f64) -> f64 {
        round_to(30.0 + 20.0 * (1.0 + t.sin()) / 2.0, 2)
    }
}

impl Default for SimulatedRangefinder {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceSensor for SimulatedRangefinder {
    fn setup(&mut self) -> Result<()> {
        debug!("[SIM] Rangefinder setup");
        Ok(())
    }

    fn measure(&mut self) -> f64 {
        let distance = Self::distance_at(self.clock.now().as_secs_f64());
        trace!("[SIM] Measured {} cm", distance);
        distance
    }

    fn cleanup(&mut self) {
        debug!("[SIM] Rangefinder cleanup");
    }
}
