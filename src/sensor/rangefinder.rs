use super::DistanceSensor;
use crate::error::{ProxwatchError, Result};
use crate::hal::{Clock, InputPin, MonotonicClock, OutputPin, SysfsPin, ThreadDelay};
use crate::history::NO_READING_CM;
use embedded_hal::delay::DelayNs;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest wait for each echo edge
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(100);

/// Width of the trigger pulse in microseconds
pub const TRIGGER_PULSE_US: u32 = 10;

/// Half the speed of sound in cm/s, the echo covers the distance twice
pub const HALF_SPEED_OF_SOUND_CM_S: f64 = 17_150.0;

/// HC-SR04 style driver on the Linux sysfs GPIO interface
pub type SysfsRangefinder = RangefinderDriver<SysfsPin, SysfsPin, MonotonicClock, ThreadDelay>;

/// Trigger/echo ultrasonic rangefinder.
///
/// Out-of-range results are returned as measured; only a missed echo edge
/// produces [`NO_READING_CM`].
pub struct RangefinderDriver<T, E, C, D> {
    trigger: T,
    echo: E,
    clock: C,
    delay: D,
    settle: Duration,
}

impl SysfsRangefinder {
    /// Export the trigger and echo pins
    pub fn open(trigger_pin: u32, echo_pin: u32, settle: Duration) -> Result<Self> {
        let trigger = SysfsPin::output(trigger_pin)?;
        let echo = SysfsPin::input(echo_pin)?;
        info!(
            "Rangefinder on GPIO trigger={} echo={}",
            trigger_pin, echo_pin
        );

        Ok(Self::new(
            trigger,
            echo,
            MonotonicClock::new(),
            ThreadDelay,
            settle,
        ))
    }
}

impl<T, E, C, D> RangefinderDriver<T, E, C, D>
where
    T: OutputPin,
    E: InputPin,
    C: Clock,
    D: DelayNs,
{
    pub fn new(trigger: T, echo: E, clock: C, delay: D, settle: Duration) -> Self {
        Self {
            trigger,
            echo,
            clock,
            delay,
            settle,
        }
    }

    fn elapsed_since(&self, start: Duration) -> Duration {
        self.clock.now().saturating_sub(start)
    }

    fn pulse_trigger(&mut self) -> std::result::Result<(), T::Error> {
        self.trigger.set_high()?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low()
    }

    /// Spin until the echo line reads `high`, returning when it did
    fn wait_for_echo(&mut self, high: bool, since: Duration) -> Option<Duration> {
        loop {
            match self.echo.is_high() {
                Ok(level) if level == high => return Some(self.clock.now()),
                Ok(_) => {
                    if self.elapsed_since(since) > ECHO_TIMEOUT {
                        debug!(
                            "Timeout waiting for echo {}",
                            if high { "start" } else { "end" }
                        );
                        return None;
                    }
                }
                Err(e) => {
                    warn!("Failed to read echo line: {:?}", e);
                    return None;
                }
            }
        }
    }
}

impl<T, E, C, D> DistanceSensor for RangefinderDriver<T, E, C, D>
where
    T: OutputPin + Send,
    E: InputPin + Send,
    C: Clock,
    D: DelayNs + Send,
{
    fn setup(&mut self) -> Result<()> {
        self.trigger.set_low().map_err(|e| {
            ProxwatchError::component("sensor", format!("failed to drive trigger: {:?}", e))
        })?;
        let settle_ms = u32::try_from(self.settle.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(settle_ms);
        debug!("Rangefinder settled for {:?}", self.settle);
        Ok(())
    }

    fn measure(&mut self) -> f64 {
        if let Err(e) = self.pulse_trigger() {
            warn!("Failed to pulse trigger: {:?}", e);
            return NO_READING_CM;
        }

        let wait_start = self.clock.now();
        let Some(pulse_start) = self.wait_for_echo(true, wait_start) else {
            return NO_READING_CM;
        };
        let Some(pulse_end) = self.wait_for_echo(false, pulse_start) else {
            return NO_READING_CM;
        };

        pulse_to_distance(pulse_end.saturating_sub(pulse_start))
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.trigger.set_low() {
            warn!("Failed to release trigger: {:?}", e);
        }
    }
}

/// Convert an echo pulse width to centimeters, rounded to 2 decimals
pub fn pulse_to_distance(pulse: Duration) -> f64 {
    round_to(pulse.as_secs_f64() * HALF_SPEED_OF_SOUND_CM_S, 2)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
