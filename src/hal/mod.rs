//! Hardware access for the Raspberry Pi peripherals.
//!
//! Every device is reached through a small trait with a Linux implementation
//! and a simulated one. [`HardwareBackend`] is decided once at startup and
//! every component builds its devices from it, so nothing downstream checks
//! for hardware presence again.

pub mod clock;
pub mod gpio;
pub mod pixels;
pub mod serial;
pub mod spidev;

pub use clock::{Clock, MonotonicClock, ThreadDelay};
pub use gpio::{
    DynOutputPin, InputPin, OutputPin, PinState, SimulatedPin, StatefulOutputPin, SysfsPin,
    GPIO_SYSFS_ROOT,
};
pub use pixels::{PixelStrip, Rgb, SimulatedStrip, Ws2812SpiStrip};
pub use serial::SerialPort;
pub use spidev::SpiDevice;

use crate::error::Result;
use std::path::Path;
use tracing::{info, warn};

/// Which implementation hardware-facing components use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareBackend {
    Real,
    Simulated,
}

impl HardwareBackend {
    /// Pick the backend. `force_simulation` wins over detection.
    pub fn select(force_simulation: bool) -> Self {
        Self::select_with_root(force_simulation, Path::new(GPIO_SYSFS_ROOT))
    }

    fn select_with_root(force_simulation: bool, gpio_root: &Path) -> Self {
        if force_simulation {
            info!("Simulation forced, using simulated hardware");
            return HardwareBackend::Simulated;
        }

        if gpio_root.exists() {
            info!("GPIO interface found at {}", gpio_root.display());
            HardwareBackend::Real
        } else {
            warn!(
                "No GPIO interface at {}, falling back to simulated hardware",
                gpio_root.display()
            );
            HardwareBackend::Simulated
        }
    }

    pub fn is_simulated(self) -> bool {
        self == HardwareBackend::Simulated
    }

    /// Output pin for `pin`, or a simulated line named `label`
    pub fn output_pin(self, pin: u32, label: &'static str) -> Result<DynOutputPin> {
        match self {
            HardwareBackend::Real => Ok(Box::new(SysfsPin::output(pin)?)),
            HardwareBackend::Simulated => Ok(Box::new(SimulatedPin::new(label))),
        }
    }

    /// LED strip on `spi_device`, or an in-memory strip of `len` pixels
    pub fn pixel_strip(
        self,
        spi_device: &str,
        len: usize,
        brightness: f32,
    ) -> Result<Box<dyn PixelStrip>> {
        match self {
            HardwareBackend::Real => Ok(Box::new(Ws2812SpiStrip::open(spi_device, brightness)?)),
            HardwareBackend::Simulated => Ok(Box::new(SimulatedStrip::new(len))),
        }
    }
}
