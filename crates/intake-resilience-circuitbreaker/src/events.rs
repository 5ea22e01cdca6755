use crate::circuit::CircuitState;
use intake_resilience_core::events::ResilienceEvent;
use intake_resilience_core::FailureCause;
use std::time::Instant;

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The circuit moved between states.
    StateTransition {
        pattern_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call was let through.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
        /// True for the single half-open trial.
        trial: bool,
    },
    /// A call was short-circuited without reaching the operation.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A permitted call completed successfully.
    SuccessRecorded {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A permitted call failed.
    FailureRecorded {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// The half-open trial was dropped before it produced a result.
    TrialAbandoned {
        pattern_name: String,
        timestamp: Instant,
    },
    /// The fallback handler was invoked.
    FallbackInvoked {
        pattern_name: String,
        timestamp: Instant,
        cause: FailureCause,
    },
    /// The fallback handler itself failed and the call resolved to nothing.
    FallbackFailed {
        pattern_name: String,
        timestamp: Instant,
        cause: FailureCause,
        reason: String,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "StateTransition",
            CircuitBreakerEvent::CallPermitted { .. } => "CallPermitted",
            CircuitBreakerEvent::CallRejected { .. } => "CallRejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "SuccessRecorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "FailureRecorded",
            CircuitBreakerEvent::TrialAbandoned { .. } => "TrialAbandoned",
            CircuitBreakerEvent::FallbackInvoked { .. } => "FallbackInvoked",
            CircuitBreakerEvent::FallbackFailed { .. } => "FallbackFailed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::TrialAbandoned { timestamp, .. }
            | CircuitBreakerEvent::FallbackInvoked { timestamp, .. }
            | CircuitBreakerEvent::FallbackFailed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallPermitted { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { pattern_name, .. }
            | CircuitBreakerEvent::FailureRecorded { pattern_name, .. }
            | CircuitBreakerEvent::TrialAbandoned { pattern_name, .. }
            | CircuitBreakerEvent::FallbackInvoked { pattern_name, .. }
            | CircuitBreakerEvent::FallbackFailed { pattern_name, .. } => pattern_name,
        }
    }
}
