use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed = 0,
    /// The circuit is open and calls are rejected.
    Open = 1,
    /// The circuit admits a single trial call.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Lower-case label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Snapshot of circuit breaker metrics for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    /// Current state of the circuit breaker.
    pub state: CircuitState,
    /// Calls recorded in the rolling window.
    pub total_calls: usize,
    /// Failed calls in the rolling window.
    pub failure_count: usize,
    /// Successful calls in the rolling window.
    pub success_count: usize,
    /// Failure percentage of the rolling window, 0.0 to 100.0.
    pub failure_percentage: f64,
    /// Whether the half-open trial is currently running.
    pub trial_in_flight: bool,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
}

#[derive(Debug, Clone, Copy)]
struct CallRecord {
    timestamp: Instant,
    is_failure: bool,
}

/// What a caller was granted by [`Circuit::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ticket {
    Rejected,
    Permitted,
    /// The half-open trial, tagged with the generation it belongs to.
    Trial { generation: u64 },
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    records: VecDeque<CallRecord>,
    trial_in_flight: bool,
    // Bumped on every transition so stale trial results can be recognized.
    generation: u64,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            records: VecDeque::new(),
            trial_in_flight: false,
            generation: 0,
        }
    }

    /// Current state, after moving Open to HalfOpen if the reset timeout has
    /// elapsed.
    pub(crate) fn state(&mut self, config: &CircuitBreakerConfig) -> CircuitState {
        self.poll_reset_timeout(config);
        self.state
    }

    pub(crate) fn metrics(&mut self, config: &CircuitBreakerConfig) -> CircuitMetrics {
        self.poll_reset_timeout(config);
        self.prune(config.rolling_count_timeout);
        let (total_calls, failure_count) = self.window_stats();
        CircuitMetrics {
            state: self.state,
            total_calls,
            failure_count,
            success_count: total_calls - failure_count,
            failure_percentage: percentage(failure_count, total_calls),
            trial_in_flight: self.trial_in_flight,
            time_since_state_change: Instant::now().saturating_duration_since(self.last_state_change),
        }
    }

    fn poll_reset_timeout(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::Open
            && Instant::now().saturating_duration_since(self.last_state_change) >= config.reset_timeout
        {
            self.transition_to(CircuitState::HalfOpen, config);
        }
    }

    fn prune(&mut self, window: Duration) {
        let now = Instant::now();
        while let Some(record) = self.records.front() {
            if now.saturating_duration_since(record.timestamp) >= window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    fn window_stats(&self) -> (usize, usize) {
        let failures = self.records.iter().filter(|r| r.is_failure).count();
        (self.records.len(), failures)
    }

    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> Ticket {
        self.poll_reset_timeout(config);

        let ticket = match self.state {
            CircuitState::Closed => Ticket::Permitted,
            CircuitState::HalfOpen if !self.trial_in_flight => {
                self.trial_in_flight = true;
                Ticket::Trial {
                    generation: self.generation,
                }
            }
            CircuitState::HalfOpen | CircuitState::Open => Ticket::Rejected,
        };

        match ticket {
            Ticket::Rejected => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallRejected {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        state: self.state,
                    });

                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);
            }
            Ticket::Permitted | Ticket::Trial { .. } => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        state: self.state,
                        trial: matches!(ticket, Ticket::Trial { .. }),
                    });
            }
        }

        ticket
    }

    /// Records the outcome of a call admitted with `ticket`.
    pub(crate) fn record(&mut self, config: &CircuitBreakerConfig, ticket: Ticket, is_failure: bool) {
        let event = if is_failure {
            CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            }
        } else {
            CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_calls_total",
            "circuitbreaker" => config.name.clone(),
            "outcome" => if is_failure { "failure" } else { "success" }
        )
        .increment(1);

        match ticket {
            Ticket::Trial { generation }
                if self.state == CircuitState::HalfOpen && generation == self.generation =>
            {
                if is_failure {
                    tracing::warn!(breaker = %config.name, "half-open trial failed, reopening circuit");
                    self.transition_to(CircuitState::Open, config);
                } else {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            // Outcomes of calls admitted before the circuit left Closed belong
            // to a window that has already been judged.
            _ if self.state != CircuitState::Closed => {}
            _ => {
                self.prune(config.rolling_count_timeout);
                self.records.push_back(CallRecord {
                    timestamp: Instant::now(),
                    is_failure,
                });
                self.evaluate_window(config);
            }
        }
    }

    /// Releases the half-open trial without recording an outcome.
    pub(crate) fn abandon_trial(&mut self, config: &CircuitBreakerConfig, generation: u64) {
        if self.state == CircuitState::HalfOpen
            && self.generation == generation
            && self.trial_in_flight
        {
            self.trial_in_flight = false;
            tracing::debug!(breaker = %config.name, "half-open trial abandoned");
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::TrialAbandoned {
                    pattern_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                });
        }
    }

    fn evaluate_window(&mut self, config: &CircuitBreakerConfig) {
        let (total, failures) = self.window_stats();
        if total == 0 || total < config.volume_threshold {
            return;
        }
        let failure_percentage = percentage(failures, total);
        if failure_percentage > config.error_threshold_percentage {
            tracing::warn!(
                breaker = %config.name,
                failure_percentage,
                threshold = config.error_threshold_percentage,
                calls = total,
                "failure threshold exceeded, opening circuit"
            );
            self.transition_to(CircuitState::Open, config);
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    /// Closes the circuit and forgets the rolling window, even if already closed.
    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.records.clear();
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state,
                to_state: state,
            });

        tracing::info!(
            breaker = %config.name,
            from = from_state.as_str(),
            to = state.as_str(),
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.records.clear();
        self.trial_in_flight = false;
        self.generation = self.generation.wrapping_add(1);
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
