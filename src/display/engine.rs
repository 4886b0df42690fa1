use super::render::{render_frame, status_color};
use crate::config::DisplayConfig;
use crate::error::Result;
use crate::events::{EventBus, ProxwatchEvent};
use crate::hal::{HardwareBackend, PixelStrip, Rgb};
use crate::state::{ChannelStatus, DisplayMode, SharedTelemetryState, TelemetryState};
use crate::transport::StatusIndicator;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often the rotation task checks whether a mode switch is due
pub const ROTATION_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// How long `stop` waits for the rotation task before blanking the strip
pub const ANIMATION_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

const FLASH_DURATION: Duration = Duration::from_millis(200);

/// Drives the LED strip from the shared telemetry state and rotates the
/// display mode on a timer
pub struct AnimationEngine {
    strip: Mutex<Box<dyn PixelStrip>>,
    last_frame: Mutex<Vec<Rgb>>,
    state: SharedTelemetryState,
    event_bus: EventBus,
    led_count: usize,
    threshold_cm: f64,
    rotation_interval: Duration,
    cancellation_token: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AnimationEngine {
    pub fn new(
        strip: Box<dyn PixelStrip>,
        state: SharedTelemetryState,
        event_bus: EventBus,
        led_count: usize,
        threshold_cm: f64,
        rotation_interval: Duration,
    ) -> Self {
        Self {
            strip: Mutex::new(strip),
            last_frame: Mutex::new(vec![Rgb::OFF; led_count]),
            state,
            event_bus,
            led_count,
            threshold_cm,
            rotation_interval,
            cancellation_token: Mutex::new(CancellationToken::new()),
            task: Mutex::new(None),
        }
    }

    /// Build the strip for the selected backend
    pub fn from_config(
        backend: HardwareBackend,
        config: &DisplayConfig,
        threshold_cm: f64,
        state: SharedTelemetryState,
        event_bus: EventBus,
    ) -> Result<Self> {
        let strip = backend.pixel_strip(&config.spi_device, config.led_count, config.brightness)?;
        info!(
            "LED strip ready: {} pixels, brightness {}",
            config.led_count, config.brightness
        );

        Ok(Self::new(
            strip,
            state,
            event_bus,
            config.led_count,
            threshold_cm,
            config.rotation_interval(),
        ))
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// Frame for `state` without touching the strip
    pub fn render(&self, state: &TelemetryState) -> Vec<Rgb> {
        render_frame(state, self.led_count, self.threshold_cm)
    }

    /// Redraw the strip from the current shared state
    pub fn update_display(&self) {
        let frame = self.render(&self.state.snapshot());
        self.show(frame);
    }

    pub fn last_frame(&self) -> Vec<Rgb> {
        self.last_frame.lock().clone()
    }

    fn show(&self, frame: Vec<Rgb>) {
        let mut strip = self.strip.lock();
        if let Err(e) = strip.show(&frame) {
            warn!("Failed to update LEDs: {}", e);
        }
        *self.last_frame.lock() = frame;
    }

    /// Set every pixel to one color
    pub fn fill(&self, color: Rgb) {
        self.show(vec![color; self.led_count]);
    }

    /// Switch to the next mode if the rotation interval has passed since the
    /// last switch
    pub fn advance_mode_if_due(&self, now: Instant) -> Option<DisplayMode> {
        let since_switch = now.saturating_duration_since(self.state.last_mode_switch());
        if since_switch <= self.rotation_interval {
            return None;
        }

        let mode = self.state.rotate_mode(now);
        info!("Display mode -> {:?}", mode);
        self.event_bus.publish(ProxwatchEvent::DisplayModeChanged {
            mode,
            timestamp: SystemTime::now(),
        });
        Some(mode)
    }

    /// Spawn the mode rotation task
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            warn!("Animation engine is already running");
            return;
        }

        let token = CancellationToken::new();
        *self.cancellation_token.lock() = token.clone();

        let engine = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            engine.run_rotation_loop(token).await;
        }));

        info!("Animation engine started");
    }

    async fn run_rotation_loop(&self, token: CancellationToken) {
        loop {
            if sleep_or_cancel(&token, ROTATION_CHECK_INTERVAL).await {
                break;
            }

            if self.advance_mode_if_due(Instant::now()).is_some() {
                self.fill(Rgb::WHITE);
                if sleep_or_cancel(&token, FLASH_DURATION).await {
                    break;
                }
                self.fill(Rgb::OFF);
                if sleep_or_cancel(&token, FLASH_DURATION).await {
                    break;
                }
            }
        }
        debug!("Rotation task exited");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the rotation task and blank the strip, whether or not the task
    /// stopped in time
    pub async fn stop(&self) {
        info!("Stopping animation engine");
        self.cancellation_token.lock().cancel();

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            match timeout(ANIMATION_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("Rotation task joined"),
                Ok(Err(e)) => warn!("Rotation task ended abnormally: {}", e),
                Err(_) => warn!(
                    "Rotation task did not stop within {:?}",
                    ANIMATION_JOIN_TIMEOUT
                ),
            }
        }

        self.shutdown_sequence();
    }

    /// Blue sweep, then green, then dark
    pub async fn startup_sequence(&self) {
        info!("Running LED startup sequence");
        let mut frame = vec![Rgb::OFF; self.led_count];
        for lit in 1..=self.led_count {
            frame[..lit].fill(Rgb::BLUE);
            self.show(frame.clone());
            sleep(Duration::from_millis(100)).await;
        }

        sleep(Duration::from_millis(500)).await;
        self.fill(Rgb::GREEN);
        sleep(Duration::from_secs(1)).await;
        self.fill(Rgb::OFF);
    }

    /// Three red flashes
    pub async fn alert_pattern(&self) {
        for _ in 0..3 {
            self.fill(Rgb::RED);
            sleep(FLASH_DURATION).await;
            self.fill(Rgb::OFF);
            sleep(FLASH_DURATION).await;
        }
    }

    pub fn shutdown_sequence(&self) {
        self.fill(Rgb::OFF);
    }
}

impl StatusIndicator for AnimationEngine {
    fn show_status(&self, status: ChannelStatus) {
        let mut frame = self.last_frame();
        if let Some(indicator) = frame.last_mut() {
            *indicator = status_color(status);
            self.show(frame);
        }
    }
}

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}
