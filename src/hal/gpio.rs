//! GPIO pins
//!
//! Pins implement the `embedded-hal` digital traits so the sensor and buzzer
//! logic never knows whether it is talking to the Linux sysfs interface or a
//! simulated line.

use crate::error::HardwareError;
pub use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState, StatefulOutputPin};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Root of the kernel's sysfs GPIO interface
pub const GPIO_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Output pin boxed behind the backend choice
pub type DynOutputPin = Box<dyn OutputPin<Error = HardwareError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
}

/// A BCM pin exported through `/sys/class/gpio`
pub struct SysfsPin {
    pin: u32,
    value: File,
}

impl SysfsPin {
    /// Export `pin` as an output driven low
    pub fn output(pin: u32) -> Result<Self, HardwareError> {
        Self::open(pin, Direction::Out)
    }

    /// Export `pin` as an input
    pub fn input(pin: u32) -> Result<Self, HardwareError> {
        Self::open(pin, Direction::In)
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn open(pin: u32, direction: Direction) -> Result<Self, HardwareError> {
        let setup_err = |source: io::Error| HardwareError::GpioSetup { pin, source };
        let pin_dir = pin_path(pin);

        if !pin_dir.exists() {
            std::fs::write(Path::new(GPIO_SYSFS_ROOT).join("export"), pin.to_string())
                .map_err(setup_err)?;
            debug!("Exported GPIO {}", pin);
        }

        // "low" selects output and drives it low in one write
        let direction_value = match direction {
            Direction::In => "in",
            Direction::Out => "low",
        };

        // udev may need a moment to hand over permissions after export
        let mut attempts = 0;
        loop {
            match std::fs::write(pin_dir.join("direction"), direction_value) {
                Ok(()) => break,
                Err(e) if attempts < 10 && e.kind() == io::ErrorKind::PermissionDenied => {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(setup_err(e)),
            }
        }

        let value = OpenOptions::new()
            .read(true)
            .write(direction == Direction::Out)
            .open(pin_dir.join("value"))
            .map_err(setup_err)?;

        debug!("GPIO {} configured as {:?}", pin, direction);

        Ok(Self { pin, value })
    }

    fn io_err(&self, source: io::Error) -> HardwareError {
        HardwareError::GpioIo {
            pin: self.pin,
            source,
        }
    }

    fn write_level(&mut self, high: bool) -> Result<(), HardwareError> {
        let byte: &[u8] = if high { b"1" } else { b"0" };
        self.value
            .write_at(byte, 0)
            .map(|_| ())
            .map_err(|e| self.io_err(e))
    }
}

impl ErrorType for SysfsPin {
    type Error = HardwareError;
}

impl OutputPin for SysfsPin {
    fn set_high(&mut self) -> Result<(), HardwareError> {
        self.write_level(true)
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.write_level(false)
    }
}

impl InputPin for SysfsPin {
    fn is_high(&mut self) -> Result<bool, HardwareError> {
        let mut buf = [0u8; 1];
        self.value
            .read_at(&mut buf, 0)
            .map(|_| buf[0] == b'1')
            .map_err(|e| self.io_err(e))
    }

    fn is_low(&mut self) -> Result<bool, HardwareError> {
        self.is_high().map(|high| !high)
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if let Err(e) = std::fs::write(
            Path::new(GPIO_SYSFS_ROOT).join("unexport"),
            self.pin.to_string(),
        ) {
            debug!("Failed to unexport GPIO {}: {}", self.pin, e);
        }
    }
}

fn pin_path(pin: u32) -> PathBuf {
    Path::new(GPIO_SYSFS_ROOT).join(format!("gpio{}", pin))
}

/// Output line that only remembers its level
#[derive(Clone)]
pub struct SimulatedPin {
    label: &'static str,
    level: Arc<AtomicBool>,
}

impl SimulatedPin {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            level: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared view of the level, usable after the pin has been boxed
    pub fn level_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.level)
    }
}

impl ErrorType for SimulatedPin {
    type Error = HardwareError;
}

impl OutputPin for SimulatedPin {
    fn set_high(&mut self) -> Result<(), HardwareError> {
        if !self.level.swap(true, Ordering::Relaxed) {
            trace!("[SIM] {} -> high", self.label);
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        if self.level.swap(false, Ordering::Relaxed) {
            trace!("[SIM] {} -> low", self.label);
        }
        Ok(())
    }
}

impl StatefulOutputPin for SimulatedPin {
    fn is_set_high(&mut self) -> Result<bool, HardwareError> {
        Ok(self.level.load(Ordering::Relaxed))
    }

    fn is_set_low(&mut self) -> Result<bool, HardwareError> {
        Ok(!self.level.load(Ordering::Relaxed))
    }
}

impl InputPin for SimulatedPin {
    fn is_high(&mut self) -> Result<bool, HardwareError> {
        Ok(self.level.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, HardwareError> {
        Ok(!self.level.load(Ordering::Relaxed))
    }
}
