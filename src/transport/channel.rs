use crate::error::HardwareError;
use crate::hal::{SerialPort, SpiDevice};
use std::io;
use tracing::debug;

/// One outbound link to the companion device
pub trait TelemetryChannel: Send {
    fn name(&self) -> &'static str;

    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Release the underlying device
    fn close(&mut self) {}
}

/// Line-oriented UART link
pub struct SerialChannel {
    port: Option<SerialPort>,
}

impl SerialChannel {
    pub const NAME: &'static str = "uart";

    pub fn open(path: &str, baud_rate: u32) -> Result<Self, HardwareError> {
        let port = SerialPort::open(path, baud_rate)?;
        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self { port: Some(port) })
    }
}

impl TelemetryChannel for SerialChannel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self.port.as_mut() {
            Some(port) => port.write_line(data),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "serial port closed")),
        }
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            debug!("Closing serial port {}", port.path());
        }
    }
}

/// Fixed-frame SPI link
pub struct SpiChannel {
    device: Option<SpiDevice>,
}

impl SpiChannel {
    pub const NAME: &'static str = "spi";

    pub fn open(path: &str, max_speed_hz: u32) -> Result<Self, HardwareError> {
        let device = SpiDevice::open(path, max_speed_hz)?;
        debug!("Opened SPI device {} at {} Hz", path, max_speed_hz);
        Ok(Self {
            device: Some(device),
        })
    }
}

impl TelemetryChannel for SpiChannel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self.device.as_mut() {
            Some(device) => device.write(data),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "SPI device closed")),
        }
    }

    fn close(&mut self) {
        if let Some(device) = self.device.take() {
            debug!("Closing SPI device {}", device.path());
        }
    }
}
