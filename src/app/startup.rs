use super::{ComponentState, ProxwatchOrchestrator, COMPONENTS};
use crate::audit::AuditLog;
use crate::error::{ProxwatchError, Result};
use std::sync::Arc;
use tracing::{error, info};

impl ProxwatchOrchestrator {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing proxwatch components");

        let mut states = self.component_states.lock().await;
        for component in COMPONENTS {
            states.insert(component.to_string(), ComponentState::Stopped);
        }
        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Bring the system up: settle the sensor, greet on LEDs and buzzer,
    /// then start the background tasks
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting proxwatch system");

        self.set_component_state("sensor", ComponentState::Starting)
            .await;
        if let Err(e) = self.monitor.setup_sensor().await {
            error!("Failed to set up rangefinder: {}", e);
            self.set_component_state("sensor", ComponentState::Failed)
                .await;
            return Err(e);
        }
        self.set_component_state("sensor", ComponentState::Running)
            .await;

        // Channels were opened at construction
        self.set_component_state("transport", ComponentState::Running)
            .await;

        self.set_component_state("audit", ComponentState::Starting)
            .await;
        let audit_log = AuditLog::new(&self.config.system.audit_log_path);
        self.audit_task = Some(audit_log.spawn(
            &self.event_bus,
            self.cancellation_token.child_token(),
        ));
        self.set_component_state("audit", ComponentState::Running)
            .await;

        self.set_component_state("display", ComponentState::Starting)
            .await;
        self.display.startup_sequence().await;
        self.display.start();
        self.set_component_state("display", ComponentState::Running)
            .await;

        self.set_component_state("alarm", ComponentState::Starting)
            .await;
        // Chime before the pattern task owns the buzzer
        let alarm = Arc::clone(&self.alarm);
        tokio::task::spawn_blocking(move || alarm.startup_chime())
            .await
            .map_err(|e| ProxwatchError::component("alarm", format!("startup chime failed: {}", e)))?;
        self.alarm.start();
        self.set_component_state("alarm", ComponentState::Running)
            .await;

        self.set_component_state("monitor", ComponentState::Starting)
            .await;
        let monitor = Arc::clone(&self.monitor);
        let token = self.cancellation_token.child_token();
        self.monitor_task = Some(tokio::spawn(async move {
            monitor.run(token).await;
        }));
        self.set_component_state("monitor", ComponentState::Running)
            .await;

        info!("System ready, monitoring started");
        Ok(())
    }
}
