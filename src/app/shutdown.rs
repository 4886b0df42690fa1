use super::{ComponentState, ProxwatchOrchestrator};
use crate::error::{ProxwatchError, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info};

/// Bound on waiting for the monitor loop to finish its current cycle
const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(2);

const AUDIT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

impl ProxwatchOrchestrator {
    /// Stop every task, drive outputs off and release devices. Each step runs
    /// even if an earlier one failed; any failure makes the exit code 1.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        let monitor_task = self.monitor_task.take();
        if let Err(e) = self
            .join_task("monitor", monitor_task, MONITOR_STOP_TIMEOUT)
            .await
        {
            error!("Error stopping monitor: {}", e);
            exit_code = 1;
        }

        self.set_component_state("alarm", ComponentState::Stopping)
            .await;
        self.alarm.stop().await;
        self.set_component_state("alarm", ComponentState::Stopped)
            .await;

        self.set_component_state("display", ComponentState::Stopping)
            .await;
        self.display.stop().await;
        self.set_component_state("display", ComponentState::Stopped)
            .await;

        let audit_task = self.audit_task.take();
        if let Err(e) = self.join_task("audit", audit_task, AUDIT_STOP_TIMEOUT).await {
            error!("Error stopping audit log: {}", e);
            exit_code = 1;
        }

        self.set_component_state("transport", ComponentState::Stopping)
            .await;
        self.transport.cleanup();
        self.set_component_state("transport", ComponentState::Stopped)
            .await;

        self.set_component_state("sensor", ComponentState::Stopping)
            .await;
        self.monitor.cleanup_sensor();
        self.set_component_state("sensor", ComponentState::Stopped)
            .await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Wait for a cancelled task to finish
    async fn join_task(
        &self,
        component: &str,
        handle: Option<JoinHandle<()>>,
        limit: Duration,
    ) -> Result<()> {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        let Some(handle) = handle else {
            self.set_component_state(component, ComponentState::Stopped)
                .await;
            return Ok(());
        };

        match timeout(limit, handle).await {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(ProxwatchError::component(
                    component,
                    format!("task ended abnormally: {}", e),
                ))
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", component);
                Err(ProxwatchError::component(component, "stop timeout"))
            }
        }
    }
}
