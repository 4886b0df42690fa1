use super::{ProxwatchOrchestrator, ShutdownReason};
use crate::error::{ProxwatchError, Result};
use crate::events::ProxwatchEvent;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

impl ProxwatchOrchestrator {
    /// Wait for a shutdown request, then shut down. Returns the process exit
    /// code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Proxwatch system is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| ProxwatchError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| ProxwatchError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender);

        // A monitor loop that ends on its own is a failure, not a shutdown
        let mut monitor_finished = false;
        let shutdown_reason = match self.monitor_task.as_mut() {
            Some(task) => tokio::select! {
                reason = shutdown_receiver => reason
                    .map_err(|_| ProxwatchError::system("Shutdown channel closed unexpectedly"))?,
                joined = task => {
                    monitor_finished = true;
                    match joined {
                        Ok(()) => ShutdownReason::Error("monitor loop exited".to_string()),
                        Err(e) => ShutdownReason::Error(format!("monitor loop failed: {}", e)),
                    }
                }
            },
            None => shutdown_receiver
                .await
                .map_err(|_| ProxwatchError::system("Shutdown channel closed unexpectedly"))?,
        };
        if monitor_finished {
            self.monitor_task = None;
        }

        info!("Shutdown initiated: {}", shutdown_reason);
        self.event_bus.publish(ProxwatchEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: shutdown_reason.to_string(),
        });

        let mut exit_code = self.shutdown().await?;
        if let ShutdownReason::Error(_) = shutdown_reason {
            exit_code = 1;
        }

        info!("Proxwatch system shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // SIGTERM from systemd
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
