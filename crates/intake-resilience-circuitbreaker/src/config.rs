use crate::circuit::CircuitState;
use crate::events::CircuitBreakerEvent;
use intake_resilience_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the circuit breaker.
pub struct CircuitBreakerConfig {
    pub(crate) error_threshold_percentage: f64,
    pub(crate) rolling_count_timeout: Duration,
    pub(crate) reset_timeout: Duration,
    pub(crate) volume_threshold: usize,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Failure percentage that must be exceeded to open the circuit.
    pub fn error_threshold_percentage(&self) -> f64 {
        self.error_threshold_percentage
    }

    /// Span of the rolling window of call outcomes.
    pub fn rolling_count_timeout(&self) -> Duration {
        self.rolling_count_timeout
    }

    /// How long the circuit stays open before a trial is allowed.
    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Minimum number of calls in the window before the circuit may open.
    pub fn volume_threshold(&self) -> usize {
        self.volume_threshold
    }

    /// Name used in events, logs, and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    error_threshold_percentage: f64,
    rolling_count_timeout: Duration,
    reset_timeout: Duration,
    volume_threshold: usize,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        crate::describe_metrics();
        Self {
            error_threshold_percentage: 50.0,
            rolling_count_timeout: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(30),
            volume_threshold: 0,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the failure percentage that opens the circuit.
    ///
    /// The circuit opens only when the share of failures in the rolling
    /// window is strictly greater than this value. Clamped to `0.0..=100.0`.
    ///
    /// Default: 50.0
    pub fn error_threshold_percentage(mut self, percent: f64) -> Self {
        self.error_threshold_percentage = percent.clamp(0.0, 100.0);
        self
    }

    /// Sets how far back call outcomes count toward the failure percentage.
    ///
    /// Default: 10 seconds
    pub fn rolling_count_timeout(mut self, duration: Duration) -> Self {
        self.rolling_count_timeout = duration;
        self
    }

    /// Sets how long the circuit stays open before admitting a trial call.
    ///
    /// Default: 30 seconds
    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.reset_timeout = duration;
        self
    }

    /// Sets the minimum number of calls in the window before the failure
    /// percentage is evaluated.
    ///
    /// Default: 0 (the first failure can open the circuit)
    pub fn volume_threshold(mut self, calls: usize) -> Self {
        self.volume_threshold = calls;
        self
    }

    /// Gives this breaker a name for events, logs, and metrics.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for state transitions.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState, CircuitState)`: the previous and the new state.
    ///
    /// # Example
    /// ```rust
    /// use intake_resilience_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let layer = CircuitBreakerConfig::builder()
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("breaker opened (was {from:?})");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback when a call is let through.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState)`: the state the call was admitted in.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a call is short-circuited.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback when a success is recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a failure is recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Adds an already shared listener, e.g. one of the facade's log sinks.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: intake_resilience_core::EventListener<CircuitBreakerEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration without wrapping it in a layer.
    pub fn build_config(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            error_threshold_percentage: self.error_threshold_percentage,
            rolling_count_timeout: self.rolling_count_timeout,
            reset_timeout: self.reset_timeout,
            volume_threshold: self.volume_threshold,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the circuit breaker layer.
    pub fn build(self) -> crate::layer::CircuitBreakerLayer {
        crate::layer::CircuitBreakerLayer::new(self.build_config())
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
