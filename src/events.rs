use crate::recorder::SessionTrigger;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Events published by the recording monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Motion became active (rising edge)
    MotionDetected {
        regions: usize,
        timestamp: SystemTime,
    },
    /// Motion linger expired and the flag was cleared
    MotionCleared { timestamp: SystemTime },
    /// A recording session started
    SessionStarted {
        session_id: String,
        trigger: SessionTrigger,
        path: PathBuf,
    },
    /// The active session was paused
    SessionPaused { session_id: String },
    /// The active session resumed
    SessionResumed { session_id: String },
    /// The active session stopped
    SessionStopped { session_id: String },
    /// The operator requested shutdown
    ShutdownRequested { reason: String },
}

impl MonitorEvent {
    /// Human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::MotionDetected { regions, .. } => {
                format!("Motion detected in {} region(s)", regions)
            }
            MonitorEvent::MotionCleared { .. } => "Motion cleared".to_string(),
            MonitorEvent::SessionStarted {
                session_id,
                trigger,
                path,
            } => {
                format!(
                    "Session {} started ({}): {}",
                    session_id,
                    trigger.label(),
                    path.display()
                )
            }
            MonitorEvent::SessionPaused { session_id } => {
                format!("Session {} paused", session_id)
            }
            MonitorEvent::SessionResumed { session_id } => {
                format!("Session {} resumed", session_id)
            }
            MonitorEvent::SessionStopped { session_id } => {
                format!("Session {} stopped", session_id)
            }
            MonitorEvent::ShutdownRequested { reason } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::MotionDetected { .. } => "motion_detected",
            MonitorEvent::MotionCleared { .. } => "motion_cleared",
            MonitorEvent::SessionStarted { .. } => "session_started",
            MonitorEvent::SessionPaused { .. } => "session_paused",
            MonitorEvent::SessionResumed { .. } => "session_resumed",
            MonitorEvent::SessionStopped { .. } => "session_stopped",
            MonitorEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast bus for monitor events.
///
/// Holds one receiver of its own so publishing never fails when no
/// external subscriber is attached.
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
    _keepalive: broadcast::Receiver<MonitorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, keepalive) = broadcast::channel(capacity);
        Self {
            sender,
            _keepalive: keepalive,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers, returning the receiver count
    pub fn publish(&self, event: MonitorEvent) -> usize {
        match &event {
            MonitorEvent::MotionDetected { regions, .. } => {
                info!("Motion detected in {} region(s)", regions);
            }
            MonitorEvent::ShutdownRequested { reason } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                debug!("Event: {}", event.description());
            }
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Number of active subscribers (including the internal keepalive)
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
