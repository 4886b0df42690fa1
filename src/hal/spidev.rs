use crate::error::HardwareError;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use tracing::debug;

// _IOW('k', n, size) requests from linux/spi/spidev.h
const SPI_IOC_WR_MODE: u32 = 0x4001_6b01;
const SPI_IOC_WR_BITS_PER_WORD: u32 = 0x4001_6b03;
const SPI_IOC_WR_MAX_SPEED_HZ: u32 = 0x4004_6b04;

/// Half-duplex writer on a Linux `spidev` node.
///
/// Each `write` call is one transfer with chip select held for its duration.
pub struct SpiDevice {
    file: File,
    path: String,
    speed_hz: u32,
}

impl SpiDevice {
    /// Open `path` in SPI mode 0, 8 bits per word, at `speed_hz`
    pub fn open(path: &str, speed_hz: u32) -> Result<Self, HardwareError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| HardwareError::DeviceOpen {
                device: path.to_string(),
                source,
            })?;

        let device = Self {
            file,
            path: path.to_string(),
            speed_hz,
        };

        device.configure(SPI_IOC_WR_MODE, &0u8, "mode")?;
        device.configure(SPI_IOC_WR_BITS_PER_WORD, &8u8, "bits per word")?;
        device.configure(SPI_IOC_WR_MAX_SPEED_HZ, &speed_hz, "max speed")?;

        debug!("Opened SPI device {} at {} Hz", path, speed_hz);
        Ok(device)
    }

    fn configure<T>(&self, request: u32, value: &T, what: &str) -> Result<(), HardwareError> {
        // SAFETY: the fd is open for the lifetime of `self` and `value` points
        // to a live value of the width the request encodes
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                request as _,
                value as *const T,
            )
        };

        if rc < 0 {
            return Err(HardwareError::DeviceConfig {
                device: self.path.clone(),
                details: format!("failed to set {}: {}", what, io::Error::last_os_error()),
            });
        }
        Ok(())
    }

    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }
}
