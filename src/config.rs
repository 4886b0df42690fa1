use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment prefix; `PROXWATCH_<SECTION>__<KEY>` overrides `section.key`
pub const ENV_PREFIX: &str = "PROXWATCH";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxwatchConfig {
    pub sensor: SensorConfig,
    pub display: DisplayConfig,
    pub alarm: AlarmConfig,
    pub transport: TransportConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SensorConfig {
    /// BCM pin driving the ultrasonic trigger
    #[serde(default = "default_trigger_pin")]
    pub trigger_pin: u32,

    /// BCM pin reading the ultrasonic echo
    #[serde(default = "default_echo_pin")]
    pub echo_pin: u32,

    /// Main loop cadence in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Settle time after driving the trigger low at setup
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Number of LEDs on the strip, the last one is the status indicator
    #[serde(default = "default_led_count")]
    pub led_count: usize,

    /// Output brightness scale (0.0 - 1.0)
    #[serde(default = "default_brightness")]
    pub brightness: f32,

    /// SPI device used to clock out the LED strip data
    #[serde(default = "default_display_spi_device")]
    pub spi_device: String,

    /// Seconds between automatic display mode changes
    #[serde(default = "default_rotation_interval_secs")]
    pub rotation_interval_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlarmConfig {
    /// BCM pin driving the active buzzer
    #[serde(default = "default_buzzer_pin")]
    pub buzzer_pin: u32,

    /// Distance below which the alarm is critical
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold_cm: f64,

    /// Distance below which an object counts as near
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold_cm: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransportConfig {
    /// Open the UART (reliable) channel
    #[serde(default = "default_channel_enabled")]
    pub uart_enabled: bool,

    /// Serial device path
    #[serde(default = "default_uart_port")]
    pub uart_port: String,

    /// Serial baud rate
    #[serde(default = "default_uart_baud_rate")]
    pub uart_baud_rate: u32,

    /// Open the SPI (fast) channel
    #[serde(default = "default_channel_enabled")]
    pub spi_enabled: bool,

    /// spidev device path
    #[serde(default = "default_transport_spi_device")]
    pub spi_device: String,

    /// SPI clock in Hz
    #[serde(default = "default_spi_max_speed_hz")]
    pub spi_max_speed_hz: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Force the simulated hardware backend
    #[serde(default)]
    pub simulation: bool,

    /// Number of distance readings kept for visualization
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Append-only alert log
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: String,

    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl SensorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl DisplayConfig {
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_secs)
    }
}

impl ProxwatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("proxwatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_environment(path, environment())
    }

    fn load_with_environment<P: AsRef<Path>>(
        path: P,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("sensor.trigger_pin", default_trigger_pin())?
            .set_default("sensor.echo_pin", default_echo_pin())?
            .set_default("sensor.poll_interval_ms", default_poll_interval_ms())?
            .set_default("sensor.settle_ms", default_settle_ms())?
            .set_default("display.led_count", default_led_count() as i64)?
            .set_default("display.brightness", default_brightness() as f64)?
            .set_default("display.spi_device", default_display_spi_device())?
            .set_default(
                "display.rotation_interval_secs",
                default_rotation_interval_secs(),
            )?
            .set_default("alarm.buzzer_pin", default_buzzer_pin())?
            .set_default("alarm.critical_threshold_cm", default_critical_threshold())?
            .set_default("alarm.alert_threshold_cm", default_alert_threshold())?
            .set_default("transport.uart_enabled", default_channel_enabled())?
            .set_default("transport.uart_port", default_uart_port())?
            .set_default("transport.uart_baud_rate", default_uart_baud_rate())?
            .set_default("transport.spi_enabled", default_channel_enabled())?
            .set_default("transport.spi_device", default_transport_spi_device())?
            .set_default("transport.spi_max_speed_hz", default_spi_max_speed_hz())?
            .set_default("system.simulation", false)?
            .set_default("system.history_size", default_history_size() as i64)?
            .set_default("system.audit_log_path", default_audit_log_path())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(environment)
            .build()?;

        let config: ProxwatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Sensor poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        // One pixel is always reserved for the status indicator
        if self.display.led_count < 2 {
            return Err(ConfigError::Message(
                "Display led_count must be at least 2".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.display.brightness) {
            return Err(ConfigError::Message(
                "Display brightness must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.display.rotation_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Display rotation_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.alarm.critical_threshold_cm <= 0.0 || self.alarm.alert_threshold_cm <= 0.0 {
            return Err(ConfigError::Message(
                "Alarm thresholds must be greater than 0".to_string(),
            ));
        }

        if self.alarm.critical_threshold_cm >= self.alarm.alert_threshold_cm {
            return Err(ConfigError::Message(
                "Alarm critical_threshold_cm must be below alert_threshold_cm".to_string(),
            ));
        }

        if self.transport.uart_baud_rate == 0 {
            return Err(ConfigError::Message(
                "Transport uart_baud_rate must be greater than 0".to_string(),
            ));
        }

        if self.transport.spi_max_speed_hz == 0 {
            return Err(ConfigError::Message(
                "Transport spi_max_speed_hz must be greater than 0".to_string(),
            ));
        }

        if self.system.history_size == 0 {
            return Err(ConfigError::Message(
                "History size must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ProxwatchConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig {
                trigger_pin: default_trigger_pin(),
                echo_pin: default_echo_pin(),
                poll_interval_ms: default_poll_interval_ms(),
                settle_ms: default_settle_ms(),
            },
            display: DisplayConfig {
                led_count: default_led_count(),
                brightness: default_brightness(),
                spi_device: default_display_spi_device(),
                rotation_interval_secs: default_rotation_interval_secs(),
            },
            alarm: AlarmConfig {
                buzzer_pin: default_buzzer_pin(),
                critical_threshold_cm: default_critical_threshold(),
                alert_threshold_cm: default_alert_threshold(),
            },
            transport: TransportConfig {
                uart_enabled: default_channel_enabled(),
                uart_port: default_uart_port(),
                uart_baud_rate: default_uart_baud_rate(),
                spi_enabled: default_channel_enabled(),
                spi_device: default_transport_spi_device(),
                spi_max_speed_hz: default_spi_max_speed_hz(),
            },
            system: SystemConfig {
                simulation: false,
                history_size: default_history_size(),
                audit_log_path: default_audit_log_path(),
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

/// Environment layer; the double underscore keeps multi-word keys intact
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Documented default configuration, printed by `--print-config`
pub const DEFAULT_CONFIG_TOML: &str = r#"# Any key can be overridden from the environment as
# PROXWATCH_<SECTION>__<KEY>, e.g. PROXWATCH_SYSTEM__HISTORY_SIZE=3

[sensor]
# BCM pin driving the ultrasonic trigger
trigger_pin = 17
# BCM pin reading the ultrasonic echo
echo_pin = 27
# Main loop cadence in milliseconds
poll_interval_ms = 500
# Sensor settle time at startup in milliseconds
settle_ms = 500

[display]
# Number of LEDs, the last one shows the telemetry status
led_count = 8
# Brightness scale (0.0 - 1.0), keep at 0.5 or lower on USB power
brightness = 0.5
# SPI device clocking the WS2812 data line
spi_device = "/dev/spidev1.0"
# Seconds between display mode changes
rotation_interval_secs = 10

[alarm]
# BCM pin driving the active buzzer
buzzer_pin = 23
# Distance (cm) below which the buzzer beeps fast
critical_threshold_cm = 10.0
# Distance (cm) below which an object is considered near
alert_threshold_cm = 50.0

[transport]
uart_enabled = true
uart_port = "/dev/serial0"
uart_baud_rate = 115200
spi_enabled = true
spi_device = "/dev/spidev0.0"
spi_max_speed_hz = 1000000

[system]
# Force simulated hardware even when GPIO is available
simulation = false
# Readings kept for history display and telemetry
history_size = 8
# Append-only alert log
audit_log_path = "distance_log.txt"
# Event bus capacity
event_bus_capacity = 100
"#;

// Default value functions
fn default_trigger_pin() -> u32 {
    17
}
fn default_echo_pin() -> u32 {
    27
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_settle_ms() -> u64 {
    500
}

fn default_led_count() -> usize {
    8
}
fn default_brightness() -> f32 {
    0.5
}
fn default_display_spi_device() -> String {
    "/dev/spidev1.0".to_string()
}
fn default_rotation_interval_secs() -> u64 {
    10
}

fn default_buzzer_pin() -> u32 {
    23
}
fn default_critical_threshold() -> f64 {
    10.0
}
fn default_alert_threshold() -> f64 {
    50.0
}

fn default_channel_enabled() -> bool {
    true
}
fn default_uart_port() -> String {
    "/dev/serial0".to_string()
}
fn default_uart_baud_rate() -> u32 {
    115_200
}
fn default_transport_spi_device() -> String {
    "/dev/spidev0.0".to_string()
}
fn default_spi_max_speed_hz() -> u32 {
    1_000_000
}

fn default_history_size() -> usize {
    8
}
fn default_audit_log_path() -> String {
    "distance_log.txt".to_string()
}
fn default_event_bus_capacity() -> usize {
    100
}
