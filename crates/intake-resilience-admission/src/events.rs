use crate::identity::Identity;
use intake_resilience_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the admission controller.
#[derive(Debug, Clone)]
pub enum AdmissionEvent {
    /// An arrival was charged and let through.
    Admitted {
        pattern_name: String,
        timestamp: Instant,
        identity: Identity,
        limit: usize,
        remaining: usize,
    },
    /// An arrival was rejected.
    Throttled {
        pattern_name: String,
        timestamp: Instant,
        identity: Identity,
        limit: usize,
        retry_after: Duration,
    },
    /// The active window ended and every count was dropped.
    WindowRolled {
        pattern_name: String,
        timestamp: Instant,
        /// Identities that had been charged in the window that ended.
        identities: usize,
    },
}

impl ResilienceEvent for AdmissionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AdmissionEvent::Admitted { .. } => "Admitted",
            AdmissionEvent::Throttled { .. } => "Throttled",
            AdmissionEvent::WindowRolled { .. } => "WindowRolled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            AdmissionEvent::Admitted { timestamp, .. }
            | AdmissionEvent::Throttled { timestamp, .. }
            | AdmissionEvent::WindowRolled { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            AdmissionEvent::Admitted { pattern_name, .. }
            | AdmissionEvent::Throttled { pattern_name, .. }
            | AdmissionEvent::WindowRolled { pattern_name, .. } => pattern_name,
        }
    }
}
