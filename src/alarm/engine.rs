use super::severity::{AlarmSeverity, IDLE_POLL};
use crate::config::AlarmConfig;
use crate::error::Result;
use crate::hal::{DynOutputPin, HardwareBackend, OutputPin, PinState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long `stop` waits for the pattern task before forcing the buzzer off
pub const ALARM_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Plays beep patterns on an active buzzer according to the current severity
pub struct AlarmEngine {
    buzzer: Arc<Mutex<DynOutputPin>>,
    severity: Arc<AtomicU8>,
    cancellation_token: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AlarmEngine {
    pub fn new(buzzer: DynOutputPin) -> Self {
        Self {
            buzzer: Arc::new(Mutex::new(buzzer)),
            severity: Arc::new(AtomicU8::new(AlarmSeverity::Off.to_u8())),
            cancellation_token: Mutex::new(CancellationToken::new()),
            task: Mutex::new(None),
        }
    }

    /// Build the buzzer for the selected backend
    pub fn from_config(backend: HardwareBackend, config: &AlarmConfig) -> Result<Self> {
        let mut buzzer = backend.output_pin(config.buzzer_pin, "buzzer")?;
        buzzer.set_low()?;
        info!("Buzzer configured on GPIO {}", config.buzzer_pin);
        Ok(Self::new(buzzer))
    }

    pub fn set_severity(&self, severity: AlarmSeverity) {
        let previous = self.severity.swap(severity.to_u8(), Ordering::Relaxed);
        if previous != severity.to_u8() {
            debug!("Alarm severity -> {:?}", severity);
        }
    }

    pub fn severity(&self) -> AlarmSeverity {
        AlarmSeverity::from_u8(self.severity.load(Ordering::Relaxed))
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the pattern task
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            warn!("Alarm engine is already running");
            return;
        }

        let token = CancellationToken::new();
        *self.cancellation_token.lock() = token.clone();

        let buzzer = Arc::clone(&self.buzzer);
        let severity = Arc::clone(&self.severity);

        *task = Some(tokio::spawn(async move {
            Self::run_pattern_loop(buzzer, severity, token).await;
        }));

        info!("Alarm engine started");
    }

    async fn run_pattern_loop(
        buzzer: Arc<Mutex<DynOutputPin>>,
        severity: Arc<AtomicU8>,
        token: CancellationToken,
    ) {
        loop {
            let current = AlarmSeverity::from_u8(severity.load(Ordering::Relaxed));

            let off_time = match current.pattern() {
                Some(pattern) => {
                    drive(&buzzer, true);
                    if sleep_or_cancel(&token, pattern.on).await {
                        break;
                    }
                    drive(&buzzer, false);
                    pattern.off
                }
                None => {
                    drive(&buzzer, false);
                    IDLE_POLL
                }
            };

            if sleep_or_cancel(&token, off_time).await {
                break;
            }
        }

        drive(&buzzer, false);
        debug!("Alarm pattern task exited");
    }

    /// Stop the pattern task and force the buzzer off
    pub async fn stop(&self) {
        info!("Stopping alarm engine");
        self.cancellation_token.lock().cancel();

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            match timeout(ALARM_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("Alarm task joined"),
                Ok(Err(e)) => warn!("Alarm task ended abnormally: {}", e),
                Err(_) => warn!("Alarm task did not stop within {:?}", ALARM_JOIN_TIMEOUT),
            }
        }

        drive(&self.buzzer, false);
    }

    /// Sound the buzzer once, blocking the calling thread
    pub fn beep_once(&self, duration: Duration) {
        debug!("*BEEP* ({:?})", duration);
        drive(&self.buzzer, true);
        std::thread::sleep(duration);
        drive(&self.buzzer, false);
    }

    /// Two short beeps announcing that the system is up
    pub fn startup_chime(&self) {
        info!("Playing startup chime");
        self.beep_once(Duration::from_millis(100));
        std::thread::sleep(Duration::from_millis(100));
        self.beep_once(Duration::from_millis(100));
    }
}

fn drive(buzzer: &Mutex<DynOutputPin>, high: bool) {
    if let Err(e) = buzzer.lock().set_state(PinState::from(high)) {
        warn!("Failed to drive buzzer: {}", e);
    }
}

/// Sleep for `duration`, returning true if cancelled first
async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}
