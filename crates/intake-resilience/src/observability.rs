//! Tracing listeners for the component event streams.
//!
//! Components already log their own decisions. The helpers here add an
//! event-level audit trail under the `intake_resilience::events` target, so
//! it can be filtered separately, e.g.
//! `RUST_LOG=warn,intake_resilience::events=info`.
//!
//! ```rust
//! use intake_resilience::observability;
//! use intake_resilience::circuitbreaker::CircuitBreakerLayer;
//!
//! let layer = observability::log_breaker_transitions(
//!     CircuitBreakerLayer::builder().name("scanner"),
//! )
//! .build();
//! ```

use intake_resilience_admission::{AdmissionConfigBuilder, AdmissionEvent};
use intake_resilience_circuitbreaker::{CircuitBreakerConfigBuilder, CircuitBreakerEvent, CircuitState};
use intake_resilience_core::events::{EventListener, ResilienceEvent};
use intake_resilience_loadlimit::{AdaptiveLimitConfigBuilder, LoadLimitEvent};
use intake_resilience_retry::{RetryConfigBuilder, RetryEvent};
use tracing::Level;

const TARGET: &str = "intake_resilience::events";

/// Logs every event it receives at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct TracingListener {
    level: Level,
}

impl TracingListener {
    /// Creates a listener logging at `level`.
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for TracingListener {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl<E: ResilienceEvent> EventListener<E> for TracingListener {
    fn on_event(&self, event: &E) {
        let (pattern, kind) = (event.pattern_name(), event.event_type());
        if self.level == Level::ERROR {
            tracing::error!(target: TARGET, pattern, kind, ?event);
        } else if self.level == Level::WARN {
            tracing::warn!(target: TARGET, pattern, kind, ?event);
        } else if self.level == Level::INFO {
            tracing::info!(target: TARGET, pattern, kind, ?event);
        } else if self.level == Level::DEBUG {
            tracing::debug!(target: TARGET, pattern, kind, ?event);
        } else {
            tracing::trace!(target: TARGET, pattern, kind, ?event);
        }
    }
}

struct BreakerTransitions;

impl EventListener<CircuitBreakerEvent> for BreakerTransitions {
    fn on_event(&self, event: &CircuitBreakerEvent) {
        match event {
            CircuitBreakerEvent::StateTransition {
                pattern_name,
                from_state,
                to_state: CircuitState::Open,
                ..
            } => {
                tracing::warn!(target: TARGET, breaker = %pattern_name, from = from_state.as_str(), "circuit opened");
            }
            CircuitBreakerEvent::StateTransition {
                pattern_name,
                from_state,
                to_state,
                ..
            } => {
                tracing::info!(
                    target: TARGET,
                    breaker = %pattern_name,
                    from = from_state.as_str(),
                    to = to_state.as_str(),
                    "circuit state changed"
                );
            }
            CircuitBreakerEvent::FallbackFailed {
                pattern_name,
                cause,
                reason,
                ..
            } => {
                tracing::error!(target: TARGET, breaker = %pattern_name, cause = cause.as_str(), %reason, "fallback failed");
            }
            _ => {}
        }
    }
}

/// Logs breaker transitions (opening at `warn`) and fallback failures.
pub fn log_breaker_transitions(builder: CircuitBreakerConfigBuilder) -> CircuitBreakerConfigBuilder {
    builder.listener(BreakerTransitions)
}

struct RetryAttempts;

impl EventListener<RetryEvent> for RetryAttempts {
    fn on_event(&self, event: &RetryEvent) {
        match event {
            RetryEvent::Retry {
                pattern_name,
                attempt,
                delay,
                ..
            } => {
                tracing::info!(
                    target: TARGET,
                    retry = %pattern_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying"
                );
            }
            RetryEvent::Exhausted {
                pattern_name,
                attempts,
                ..
            } => {
                tracing::warn!(target: TARGET, retry = %pattern_name, attempts, "gave up");
            }
            _ => {}
        }
    }
}

/// Logs each scheduled retry and each exhausted sequence.
pub fn log_retries(builder: RetryConfigBuilder) -> RetryConfigBuilder {
    builder.listener(RetryAttempts)
}

struct Throttling;

impl EventListener<AdmissionEvent> for Throttling {
    fn on_event(&self, event: &AdmissionEvent) {
        if let AdmissionEvent::Throttled {
            pattern_name,
            identity,
            limit,
            retry_after,
            ..
        } = event
        {
            tracing::warn!(
                target: TARGET,
                admission = %pattern_name,
                %identity,
                limit,
                retry_after_ms = retry_after.as_millis() as u64,
                "request throttled"
            );
        }
    }
}

/// Logs every throttled arrival with its identity and budget.
pub fn log_throttling(builder: AdmissionConfigBuilder) -> AdmissionConfigBuilder {
    builder.listener(Throttling)
}

struct LoadLimits;

impl EventListener<LoadLimitEvent> for LoadLimits {
    fn on_event(&self, event: &LoadLimitEvent) {
        match event {
            LoadLimitEvent::LimitComputed {
                pattern_name,
                limit,
                cpu_percent,
                memory_percent,
                high_load: true,
                ..
            } => {
                tracing::warn!(
                    target: TARGET,
                    limiter = %pattern_name,
                    limit,
                    cpu_percent,
                    memory_percent,
                    "host under load, admission budget reduced"
                );
            }
            LoadLimitEvent::ProbeFailed {
                pattern_name,
                reason,
                ..
            } => {
                tracing::error!(target: TARGET, limiter = %pattern_name, %reason, "load probe failed");
            }
            _ => {}
        }
    }
}

/// Logs reduced budgets and probe failures.
pub fn log_load_limits(builder: AdaptiveLimitConfigBuilder) -> AdaptiveLimitConfigBuilder {
    builder.listener(LoadLimits)
}
