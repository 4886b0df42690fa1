use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl ProxwatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Telemetry channel failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {channel} channel on {device}: {source}")]
    ChannelOpen {
        channel: &'static str,
        device: String,
        #[source]
        source: HardwareError,
    },

    #[error("Write to {channel} channel failed: {source}")]
    ChannelWrite {
        channel: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode status packet: {0}")]
    Encode(#[from] serde_json::Error),
}

/// GPIO and device access failures
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Failed to configure GPIO {pin}: {source}")]
    GpioSetup {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("GPIO {pin} I/O failed: {source}")]
    GpioIo {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open device {device}: {source}")]
    DeviceOpen {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device {device} configuration failed: {details}")]
    DeviceConfig { device: String, details: String },
}

impl embedded_hal::digital::Error for HardwareError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ProxwatchError>;
