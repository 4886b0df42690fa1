use super::channel::{SerialChannel, SpiChannel, TelemetryChannel};
use super::packet::{encode_fast_frame, encode_status};
use super::StatusIndicator;
use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::events::{EventBus, ProxwatchEvent};
use crate::hal::HardwareBackend;
use crate::state::{ChannelStatus, DisplayMode, SharedTelemetryState};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Ships status packets to the companion device over the reliable (UART) and
/// fast (SPI) channels.
///
/// Each channel is attempted on its own; one failing never keeps the other
/// from sending. Nothing is retried.
pub struct TelemetryTransport {
    reliable: Mutex<Option<Box<dyn TelemetryChannel>>>,
    fast: Mutex<Option<Box<dyn TelemetryChannel>>>,
    simulated: bool,
    state: SharedTelemetryState,
    event_bus: EventBus,
    indicator: Option<Arc<dyn StatusIndicator>>,
}

impl TelemetryTransport {
    /// Open every enabled channel. Outside simulation a channel that fails to
    /// open aborts setup; in simulation nothing is opened.
    pub fn setup(
        config: &TransportConfig,
        backend: HardwareBackend,
        state: SharedTelemetryState,
        event_bus: EventBus,
        indicator: Option<Arc<dyn StatusIndicator>>,
    ) -> Result<Self, TransportError> {
        if backend.is_simulated() {
            info!("[SIM] Telemetry channels not opened");
            return Ok(Self::simulated(state, event_bus, indicator));
        }

        let reliable: Option<Box<dyn TelemetryChannel>> = if config.uart_enabled {
            let channel = SerialChannel::open(&config.uart_port, config.uart_baud_rate).map_err(
                |source| TransportError::ChannelOpen {
                    channel: SerialChannel::NAME,
                    device: config.uart_port.clone(),
                    source,
                },
            )?;
            Some(Box::new(channel))
        } else {
            None
        };

        let fast: Option<Box<dyn TelemetryChannel>> = if config.spi_enabled {
            let channel = SpiChannel::open(&config.spi_device, config.spi_max_speed_hz).map_err(
                |source| TransportError::ChannelOpen {
                    channel: SpiChannel::NAME,
                    device: config.spi_device.clone(),
                    source,
                },
            )?;
            Some(Box::new(channel))
        } else {
            None
        };

        info!(
            "Telemetry transport ready (uart: {}, spi: {})",
            reliable.is_some(),
            fast.is_some()
        );

        Ok(Self::with_channels(reliable, fast, state, event_bus, indicator))
    }

    /// Transport over already opened channels
    pub fn with_channels(
        reliable: Option<Box<dyn TelemetryChannel>>,
        fast: Option<Box<dyn TelemetryChannel>>,
        state: SharedTelemetryState,
        event_bus: EventBus,
        indicator: Option<Arc<dyn StatusIndicator>>,
    ) -> Self {
        Self {
            reliable: Mutex::new(reliable),
            fast: Mutex::new(fast),
            simulated: false,
            state,
            event_bus,
            indicator,
        }
    }

    /// Transport that never touches a device and reports each send on the
    /// event bus instead
    pub fn simulated(
        state: SharedTelemetryState,
        event_bus: EventBus,
        indicator: Option<Arc<dyn StatusIndicator>>,
    ) -> Self {
        Self {
            reliable: Mutex::new(None),
            fast: Mutex::new(None),
            simulated: true,
            state,
            event_bus,
            indicator,
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn has_reliable_channel(&self) -> bool {
        self.reliable.lock().is_some()
    }

    pub fn has_fast_channel(&self) -> bool {
        self.fast.lock().is_some()
    }

    /// Send one status packet on every open channel. Returns false if any
    /// channel failed, in which case the status is left at `Error`.
    pub fn send_status(
        &self,
        distance_cm: f64,
        mode: DisplayMode,
        history: &[f64],
        alert: bool,
    ) -> bool {
        let payload = match encode_status(distance_cm, mode, history, alert) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{}", e);
                self.set_status(ChannelStatus::Error);
                return false;
            }
        };
        let frame = encode_fast_frame(distance_cm);

        if self.simulated {
            self.set_status(ChannelStatus::Sending);
            trace!("[SIM] UART JSON: {}", payload.trim_end());
            trace!("[SIM] SPI frame: {:02X?}", frame);
            self.event_bus.publish(ProxwatchEvent::TelemetrySimulated {
                reliable_payload: payload,
                fast_frame: frame.to_vec(),
            });
            self.set_status(ChannelStatus::Idle);
            return true;
        }

        let before = self.state.channel_status();
        let mut success = true;
        {
            let mut reliable = self.reliable.lock();
            if let Some(channel) = reliable.as_mut() {
                success &= self.write_channel(channel.as_mut(), payload.as_bytes());
            }
        }
        {
            let mut fast = self.fast.lock();
            if let Some(channel) = fast.as_mut() {
                success &= self.write_channel(channel.as_mut(), &frame);
            }
        }

        let final_status = if success {
            ChannelStatus::Idle
        } else {
            ChannelStatus::Error
        };
        self.set_status(final_status);
        if final_status != before {
            self.event_bus.publish(ProxwatchEvent::ChannelStatusChanged {
                status: final_status,
            });
        }
        success
    }

    /// Send a raw text line on the reliable channel only
    pub fn send_alert_text(&self, message: &str) -> bool {
        if self.simulated {
            trace!("[SIM] UART send: {}", message.trim_end());
            return true;
        }

        let mut reliable = self.reliable.lock();
        match reliable.as_mut() {
            Some(channel) => {
                let sent = self.write_channel(channel.as_mut(), message.as_bytes());
                if sent {
                    self.set_status(ChannelStatus::Idle);
                }
                sent
            }
            None => {
                debug!("No reliable channel open, alert text dropped");
                false
            }
        }
    }

    fn write_channel(&self, channel: &mut dyn TelemetryChannel, data: &[u8]) -> bool {
        self.set_status(ChannelStatus::Sending);
        match channel.write(data) {
            Ok(()) => true,
            Err(source) => {
                let error = TransportError::ChannelWrite {
                    channel: channel.name(),
                    source,
                };
                warn!("{}", error);
                self.set_status(ChannelStatus::Error);
                false
            }
        }
    }

    fn set_status(&self, status: ChannelStatus) {
        self.state.set_channel_status(status);
        if let Some(indicator) = &self.indicator {
            indicator.show_status(status);
        }
    }

    /// Close every open channel
    pub fn cleanup(&self) {
        for slot in [&self.reliable, &self.fast] {
            if let Some(mut channel) = slot.lock().take() {
                channel.close();
                info!("Closed {} channel", channel.name());
            }
        }
    }
}
