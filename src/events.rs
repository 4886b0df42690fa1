use crate::error::EventBusError;
use crate::state::{ChannelStatus, DisplayMode};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events that can occur in the proxwatch system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProxwatchEvent {
    /// An object came closer than the alert threshold
    ProximityAlert {
        distance_cm: f64,
        timestamp: SystemTime,
    },
    /// The animation engine switched display mode
    DisplayModeChanged {
        mode: DisplayMode,
        timestamp: SystemTime,
    },
    /// A status packet was handled without opening any channel
    TelemetrySimulated {
        reliable_payload: String,
        fast_frame: Vec<u8>,
    },
    /// Telemetry channel status changed
    ChannelStatusChanged { status: ChannelStatus },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl ProxwatchEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ProxwatchEvent::ProximityAlert { distance_cm, .. } => {
                format!("Object detected at {:?} cm", distance_cm)
            }
            ProxwatchEvent::DisplayModeChanged { mode, .. } => {
                format!("Display mode changed to {:?}", mode)
            }
            ProxwatchEvent::TelemetrySimulated {
                reliable_payload, ..
            } => {
                format!("Simulated telemetry: {}", reliable_payload.trim_end())
            }
            ProxwatchEvent::ChannelStatusChanged { status } => {
                format!("Channel status {:?}", status)
            }
            ProxwatchEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            ProxwatchEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ProxwatchEvent::ProximityAlert { .. } => "proximity_alert",
            ProxwatchEvent::DisplayModeChanged { .. } => "display_mode_changed",
            ProxwatchEvent::TelemetrySimulated { .. } => "telemetry_simulated",
            ProxwatchEvent::ChannelStatusChanged { .. } => "channel_status_changed",
            ProxwatchEvent::SystemError { .. } => "system_error",
            ProxwatchEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast event bus shared by all components
pub struct EventBus {
    sender: broadcast::Sender<ProxwatchEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ProxwatchEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Publishing is synchronous so the steady-state loop can emit events
    /// without awaiting. Having no subscribers is not an error.
    pub fn publish(&self, event: ProxwatchEvent) -> usize {
        match &event {
            ProxwatchEvent::ProximityAlert { distance_cm, .. } => {
                info!("ALERT: Object close at {:?} cm", distance_cm);
            }
            ProxwatchEvent::SystemError { component, error } => {
                warn!("System error in {}: {}", component, error);
            }
            ProxwatchEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &ProxwatchEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<ProxwatchEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<ProxwatchEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<ProxwatchEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<ProxwatchEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

/// Component that consumes events from the bus
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an incoming event
    async fn handle_event(&mut self, event: ProxwatchEvent) -> Result<(), EventBusError>;

    /// Name used in log lines
    fn handler_name(&self) -> &str;

    /// Events this handler wants to see
    fn event_filter(&self) -> EventFilter;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus.publish(ProxwatchEvent::ProximityAlert {
            distance_cm: 12.5,
            timestamp: SystemTime::now(),
        });
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            ProxwatchEvent::ProximityAlert { distance_cm, .. } => {
                assert_eq!(distance_cm, 12.5);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(10);
        let delivered = event_bus.publish(ProxwatchEvent::ChannelStatusChanged {
            status: ChannelStatus::Idle,
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let filter = EventFilter::EventTypes(vec!["proximity_alert"]);
        let mut receiver = EventReceiver::new(event_bus.subscribe(), filter, "test".to_string());

        event_bus.publish(ProxwatchEvent::DisplayModeChanged {
            mode: DisplayMode::History,
            timestamp: SystemTime::now(),
        });
        event_bus.publish(ProxwatchEvent::ProximityAlert {
            distance_cm: 8.0,
            timestamp: SystemTime::now(),
        });

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type(), "proximity_alert");
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_event_properties() {
        let event = ProxwatchEvent::ProximityAlert {
            distance_cm: 23.5,
            timestamp: SystemTime::now(),
        };

        assert_eq!(event.event_type(), "proximity_alert");
        assert_eq!(event.description(), "Object detected at 23.5 cm");
    }
}
