use intake_resilience_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the concurrency gate.
#[derive(Debug, Clone)]
pub enum GateEvent {
    /// A caller got a slot.
    SlotAcquired {
        pattern_name: String,
        timestamp: Instant,
        /// Slots held after this acquisition.
        held: usize,
        /// Time spent queued.
        waited: Duration,
    },
    /// A slot was returned, on any exit path.
    SlotReleased {
        pattern_name: String,
        timestamp: Instant,
        held_for: Duration,
    },
    /// A caller gave up after the configured maximum wait.
    WaitTimedOut {
        pattern_name: String,
        timestamp: Instant,
        waited: Duration,
    },
}

impl ResilienceEvent for GateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GateEvent::SlotAcquired { .. } => "SlotAcquired",
            GateEvent::SlotReleased { .. } => "SlotReleased",
            GateEvent::WaitTimedOut { .. } => "WaitTimedOut",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            GateEvent::SlotAcquired { timestamp, .. }
            | GateEvent::SlotReleased { timestamp, .. }
            | GateEvent::WaitTimedOut { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            GateEvent::SlotAcquired { pattern_name, .. }
            | GateEvent::SlotReleased { pattern_name, .. }
            | GateEvent::WaitTimedOut { pattern_name, .. } => pattern_name,
        }
    }
}
