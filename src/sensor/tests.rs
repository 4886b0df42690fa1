use super::*;
use crate::error::HardwareError;
use crate::hal::{Clock, InputPin, OutputPin};
use crate::history::NO_READING_CM;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::ErrorType;
use std::result::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Clock that advances by a fixed step every time it is read
#[derive(Clone)]
struct FakeClock {
    nanos: Arc<AtomicU64>,
    step: Duration,
}

impl FakeClock {
    fn new(step: Duration) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            step,
        }
    }

    fn peek(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.advance(self.step);
        self.peek()
    }
}

/// Delay that moves the fake clock instead of sleeping
struct FakeDelay {
    clock: FakeClock,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(Duration::from_nanos(ns.into()));
    }
}

/// Echo line that is high between two points on the fake clock
struct ScriptedEcho {
    clock: FakeClock,
    rise_at: Option<Duration>,
    fall_at: Duration,
}

impl ErrorType for ScriptedEcho {
    type Error = HardwareError;
}

impl InputPin for ScriptedEcho {
    fn is_high(&mut self) -> Result<bool, HardwareError> {
        Ok(match self.rise_at {
            Some(rise) => {
                let now = self.clock.peek();
                now >= rise && now < self.fall_at
            }
            None => false,
        })
    }

    fn is_low(&mut self) -> Result<bool, HardwareError> {
        self.is_high().map(|high| !high)
    }
}

/// Trigger line that logs each level change with its timestamp
#[derive(Clone)]
struct RecordingTrigger {
    clock: FakeClock,
    edges: Arc<Mutex<Vec<(bool, Duration)>>>,
}

impl ErrorType for RecordingTrigger {
    type Error = HardwareError;
}

impl OutputPin for RecordingTrigger {
    fn set_high(&mut self) -> Result<(), HardwareError> {
        self.edges.lock().unwrap().push((true, self.clock.peek()));
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.edges.lock().unwrap().push((false, self.clock.peek()));
        Ok(())
    }
}

/// Echo line whose reads always fail
struct BrokenEcho;

impl ErrorType for BrokenEcho {
    type Error = HardwareError;
}

impl InputPin for BrokenEcho {
    fn is_high(&mut self) -> Result<bool, HardwareError> {
        Err(HardwareError::GpioIo {
            pin: 24,
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        })
    }

    fn is_low(&mut self) -> Result<bool, HardwareError> {
        self.is_high().map(|high| !high)
    }
}

fn driver_with_echo(
    rise_at: Option<Duration>,
    pulse: Duration,
    step: Duration,
) -> (
    RangefinderDriver<RecordingTrigger, ScriptedEcho, FakeClock, FakeDelay>,
    RecordingTrigger,
) {
    let clock = FakeClock::new(step);
    let trigger = RecordingTrigger {
        clock: clock.clone(),
        edges: Arc::new(Mutex::new(Vec::new())),
    };
    let echo = ScriptedEcho {
        clock: clock.clone(),
        rise_at,
        fall_at: rise_at.unwrap_or_default() + pulse,
    };
    let delay = FakeDelay {
        clock: clock.clone(),
    };
    let driver = RangefinderDriver::new(
        trigger.clone(),
        echo,
        clock,
        delay,
        Duration::from_millis(500),
    );
    (driver, trigger)
}

fn pulse_for(distance_cm: f64) -> Duration {
    Duration::from_secs_f64(distance_cm / HALF_SPEED_OF_SOUND_CM_S)
}

#[test]
fn test_measure_recovers_distance_from_echo_width() {
    for expected in [2.0, 25.0, 100.0, 257.3, 400.0] {
        let (mut driver, _) = driver_with_echo(
            Some(Duration::from_micros(300)),
            pulse_for(expected),
            Duration::from_micros(1),
        );

        let measured = driver.measure();
        assert!(
            (measured - expected).abs() < 0.1,
            "expected {} cm, measured {} cm",
            expected,
            measured
        );
    }
}

#[test]
fn test_out_of_range_reading_is_returned_as_measured() {
    let (mut driver, _) = driver_with_echo(
        Some(Duration::from_micros(300)),
        pulse_for(1.0),
        Duration::from_micros(1),
    );

    let measured = driver.measure();
    assert!(measured < 2.0);
    assert_ne!(measured, NO_READING_CM);
}

#[test]
fn test_missing_echo_start_times_out() {
    let (mut driver, _) = driver_with_echo(None, Duration::ZERO, Duration::from_micros(10));
    assert_eq!(driver.measure(), NO_READING_CM);
}

#[test]
fn test_stuck_echo_times_out() {
    let (mut driver, _) = driver_with_echo(
        Some(Duration::from_micros(300)),
        Duration::from_secs(1),
        Duration::from_micros(10),
    );
    assert_eq!(driver.measure(), NO_READING_CM);
}

#[test]
fn test_trigger_pulse_width() {
    let (mut driver, trigger) = driver_with_echo(
        Some(Duration::from_micros(300)),
        pulse_for(50.0),
        Duration::from_micros(1),
    );

    driver.measure();

    let edges = trigger.edges.lock().unwrap().clone();
    assert_eq!(edges.len(), 2);
    assert!(edges[0].0);
    assert!(!edges[1].0);
    assert_eq!(
        edges[1].1 - edges[0].1,
        Duration::from_micros(TRIGGER_PULSE_US.into())
    );
}

#[test]
fn test_echo_read_failure_reports_no_reading() {
    let clock = FakeClock::new(Duration::from_micros(1));
    let trigger = RecordingTrigger {
        clock: clock.clone(),
        edges: Arc::new(Mutex::new(Vec::new())),
    };
    let delay = FakeDelay {
        clock: clock.clone(),
    };
    let mut driver = RangefinderDriver::new(
        trigger.clone(),
        BrokenEcho,
        clock,
        delay,
        Duration::ZERO,
    );

    assert_eq!(driver.measure(), NO_READING_CM);
    // Trigger still went back low
    assert_eq!(trigger.edges.lock().unwrap().last().map(|e| e.0), Some(false));
}

#[test]
fn test_setup_waits_for_settle_time() {
    let (mut driver, trigger) =
        driver_with_echo(None, Duration::ZERO, Duration::from_micros(1));
    let start = trigger.clock.peek();

    driver.setup().unwrap();

    assert!(trigger.clock.peek() - start >= Duration::from_millis(500));
}

#[test]
fn test_setup_and_cleanup_leave_trigger_low() {
    let (mut driver, trigger) =
        driver_with_echo(None, Duration::ZERO, Duration::from_micros(1));

    driver.setup().unwrap();
    driver.cleanup();

    let edges = trigger.edges.lock().unwrap().clone();
    assert!(edges.iter().all(|(high, _)| !high));
}

#[test]
fn test_pulse_to_distance() {
    assert_eq!(pulse_to_distance(Duration::from_millis(1)), 17.15);
    assert_eq!(pulse_to_distance(Duration::ZERO), 0.0);
}

#[test]
fn test_simulated_signal_stays_in_band() {
    for i in 0..200 {
        let d = SimulatedRangefinder::distance_at(i as f64 * 0.1);
        assert!((30.0..=50.0).contains(&d), "{} out of band", d);
    }
    assert_eq!(SimulatedRangefinder::distance_at(0.0), 40.0);
}

#[test]
fn test_simulated_sensor_is_deterministic() {
    let clock = FakeClock::new(Duration::from_millis(250));
    let mut first = SimulatedRangefinder::with_clock(Box::new(clock));
    let clock = FakeClock::new(Duration::from_millis(250));
    let mut second = SimulatedRangefinder::with_clock(Box::new(clock));

    for _ in 0..10 {
        assert_eq!(first.measure(), second.measure());
    }
}
