use crate::error::HardwareError;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use tracing::debug;

/// Raw 8N1 serial port on a tty device
pub struct SerialPort {
    file: File,
    path: String,
}

impl SerialPort {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, HardwareError> {
        let speed = baud_constant(baud_rate).ok_or_else(|| HardwareError::DeviceConfig {
            device: path.to_string(),
            details: format!("unsupported baud rate {}", baud_rate),
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|source| HardwareError::DeviceOpen {
                device: path.to_string(),
                source,
            })?;

        let config_err = |what: &str| HardwareError::DeviceConfig {
            device: path.to_string(),
            details: format!("{}: {}", what, io::Error::last_os_error()),
        };

        let fd = file.as_raw_fd();
        // SAFETY: termios is plain data and fd stays open for the whole block
        unsafe {
            let mut tty: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &mut tty) != 0 {
                return Err(config_err("tcgetattr failed"));
            }

            libc::cfmakeraw(&mut tty);
            tty.c_cflag |= libc::CLOCAL | libc::CREAD;
            tty.c_cflag &= !(libc::CSTOPB | libc::PARENB);

            if libc::cfsetispeed(&mut tty, speed) != 0 || libc::cfsetospeed(&mut tty, speed) != 0 {
                return Err(config_err("cfsetspeed failed"));
            }
            if libc::tcsetattr(fd, libc::TCSANOW, &tty) != 0 {
                return Err(config_err("tcsetattr failed"));
            }
        }

        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }

    /// Write the whole buffer and wait until it has left the UART
    pub fn write_line(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        // SAFETY: fd belongs to self.file, which outlives the call
        if unsafe { libc::tcdrain(self.file.as_raw_fd()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn baud_constant(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}
