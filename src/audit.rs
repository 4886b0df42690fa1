//! Append-only trail of proximity alerts.

use crate::error::EventBusError;
use crate::events::{EventBus, EventFilter, EventHandler, EventReceiver, ProxwatchEvent};
use async_trait::async_trait;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Writes one `<local time>: <message>` line per alert
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line, creating the file if needed
    pub fn append(&self, message: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}: {}", Local::now().format(TIMESTAMP_FORMAT), message)
    }

    /// Consume alert events from the bus until cancelled or the bus closes
    pub fn spawn(mut self, event_bus: &EventBus, token: CancellationToken) -> JoinHandle<()> {
        let mut receiver = EventReceiver::new(
            event_bus.subscribe(),
            self.event_filter(),
            self.handler_name().to_string(),
        );
        info!("Audit log writing to {}", self.path.display());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) => {
                            if let Err(e) = self.handle_event(event).await {
                                warn!("Audit handler failed: {}", e);
                            }
                        }
                        Err(EventBusError::ChannelClosed) => break,
                        Err(e) => warn!("Audit log missed events: {}", e),
                    },
                }
            }
            debug!("Audit log task exited");
        })
    }
}

#[async_trait]
impl EventHandler for AuditLog {
    async fn handle_event(&mut self, event: ProxwatchEvent) -> Result<(), EventBusError> {
        if let ProxwatchEvent::ProximityAlert { .. } = event {
            // A lost audit line must never stop the alert path
            if let Err(e) = self.append(&event.description()) {
                warn!("Could not write to audit log {}: {}", self.path.display(), e);
            }
        }
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "audit_log"
    }

    fn event_filter(&self) -> EventFilter {
        EventFilter::EventTypes(vec!["proximity_alert"])
    }
}
