mod rangefinder;
mod simulated;
#[cfg(test)]
mod tests;

pub use rangefinder::{
    pulse_to_distance, RangefinderDriver, SysfsRangefinder, ECHO_TIMEOUT,
    HALF_SPEED_OF_SOUND_CM_S, TRIGGER_PULSE_US,
};
pub use simulated::SimulatedRangefinder;

pub(crate) use rangefinder::round_to;

use crate::config::SensorConfig;
use crate::error::Result;
use crate::hal::HardwareBackend;
use std::time::Duration;

/// A source of distance readings in centimeters
pub trait DistanceSensor: Send {
    /// Prepare the sensor before the first measurement
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Take one blocking measurement
    fn measure(&mut self) -> f64;

    /// Leave the sensor lines in a safe state
    fn cleanup(&mut self) {}
}

/// Build the rangefinder for the selected backend
pub fn build_sensor(
    backend: HardwareBackend,
    config: &SensorConfig,
) -> Result<Box<dyn DistanceSensor>> {
    match backend {
        HardwareBackend::Real => Ok(Box::new(SysfsRangefinder::open(
            config.trigger_pin,
            config.echo_pin,
            Duration::from_millis(config.settle_ms),
        )?)),
        HardwareBackend::Simulated => Ok(Box::new(SimulatedRangefinder::new())),
    }
}
