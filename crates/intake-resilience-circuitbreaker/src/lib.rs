//! Circuit breaker for operations behind the intake pipeline.
//!
//! The breaker keeps a time-based rolling window of call outcomes. While
//! **closed** every call goes through; once the share of failures in the
//! window is strictly greater than `error_threshold_percentage` (and the
//! window holds at least `volume_threshold` calls) it **opens** and rejects
//! calls without invoking the operation. After `reset_timeout` the next
//! arrival moves it to **half-open** and runs as the single trial: success
//! closes the circuit, failure re-opens it and restarts the timer. Other
//! arrivals during the trial are rejected.
//!
//! The trial is held by a guard. If the caller drops the future before the
//! operation finishes, the trial slot is released and the next arrival can
//! try again.
//!
//! # Example
//!
//! ```rust
//! use intake_resilience_circuitbreaker::{CircuitBreakerLayer, CircuitState};
//! use std::time::Duration;
//! use tower::{service_fn, Layer};
//!
//! # async fn example() {
//! let breaker = CircuitBreakerLayer::builder()
//!     .name("scanner")
//!     .error_threshold_percentage(50.0)
//!     .rolling_count_timeout(Duration::from_secs(10))
//!     .reset_timeout(Duration::from_secs(30))
//!     .build()
//!     .layer(service_fn(|file: String| async move {
//!         Ok::<_, std::io::Error>(file.len())
//!     }));
//!
//! let size = breaker.fire("invoice.pdf".to_string()).await.unwrap();
//! assert_eq!(size, 11);
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! # }
//! ```
//!
//! # Fallback
//!
//! [`CircuitBreaker::with_fallback`] turns the breaker into a service that
//! never fails. It answers with a [`CallOutcome`]: the primary result, the
//! fallback's result together with the [`FailureCause`], or
//! [`CallOutcome::Null`] when the fallback itself failed.
//!
//! # Metrics
//!
//! With the `metrics` feature enabled:
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `circuitbreaker_calls_total` | Counter | `circuitbreaker`, `outcome` (`success`, `failure`, `rejected`) |
//! | `circuitbreaker_transitions_total` | Counter | `circuitbreaker`, `from`, `to` |
//! | `circuitbreaker_state` | Gauge | `circuitbreaker` (0 closed, 1 open, 2 half-open) |
//! | `circuitbreaker_fallbacks_total` | Counter | `circuitbreaker`, `outcome` (`value`, `null`) |

use crate::circuit::{Circuit, Ticket};
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use fallback::{CircuitBreakerWithFallback, FallbackHandler};
pub use intake_resilience_core::{BoxError, CallOutcome, FailureCause};
pub use layer::CircuitBreakerLayer;

mod circuit;
mod config;
mod error;
mod events;
mod fallback;
mod layer;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

pub(crate) fn describe_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "circuitbreaker_calls_total",
            "Calls through the circuit breaker by outcome"
        );
        describe_counter!(
            "circuitbreaker_transitions_total",
            "Circuit breaker state transitions"
        );
        describe_gauge!(
            "circuitbreaker_state",
            "Current state of the circuit breaker"
        );
        describe_counter!(
            "circuitbreaker_fallbacks_total",
            "Fallback invocations by outcome"
        );
    });
}

/// Holds an admission through the breaker until its outcome is recorded.
///
/// Dropping it unsettled releases a half-open trial without counting it.
struct CallPermit {
    circuit: Arc<Mutex<Circuit>>,
    config: Arc<CircuitBreakerConfig>,
    ticket: Ticket,
    settled: bool,
}

impl CallPermit {
    fn acquire(circuit: Arc<Mutex<Circuit>>, config: Arc<CircuitBreakerConfig>) -> Option<Self> {
        let ticket = circuit.lock().try_acquire(&config);
        if ticket == Ticket::Rejected {
            return None;
        }
        Some(Self {
            circuit,
            config,
            ticket,
            settled: false,
        })
    }

    fn settle(mut self, is_failure: bool) {
        self.settled = true;
        self.circuit
            .lock()
            .record(&self.config, self.ticket, is_failure);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ticket::Trial { generation } = self.ticket {
            self.circuit.lock().abandon_trial(&self.config, generation);
        }
    }
}

/// A Tower Service that applies circuit breaker logic to an inner service.
///
/// Clones share the circuit state.
pub struct CircuitBreaker<S> {
    inner: S,
    pub(crate) circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
    pub(crate) config: Arc<CircuitBreakerConfig>,
}

impl<S> CircuitBreaker<S> {
    pub(crate) fn new(inner: S, config: Arc<CircuitBreakerConfig>) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            inner,
            circuit: Arc::new(Mutex::new(Circuit::new(Arc::clone(&state_atomic)))),
            state_atomic,
            config,
        }
    }

    /// Adds a fallback handler, producing a service that resolves every call
    /// to a [`CallOutcome`].
    ///
    /// The handler receives a clone of the original request whenever the
    /// call was rejected by an open circuit or the operation failed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use intake_resilience_circuitbreaker::{BoxError, CallOutcome, CircuitBreakerLayer};
    /// use tower::{service_fn, Layer, ServiceExt};
    ///
    /// # async fn example() {
    /// let breaker = CircuitBreakerLayer::builder()
    ///     .build()
    ///     .layer(service_fn(|_: String| async { Err::<String, _>("scanner down") }))
    ///     .with_fallback(|file: String| {
    ///         Box::pin(async move {
    ///             Ok::<_, BoxError>(format!("{file}: queued for later"))
    ///         })
    ///     });
    ///
    /// let outcome = breaker.oneshot("a.pdf".to_string()).await.unwrap();
    /// assert!(matches!(outcome, CallOutcome::Fallback { .. }));
    /// # }
    /// ```
    pub fn with_fallback<Req, Res, F>(self, handler: F) -> CircuitBreakerWithFallback<S, Req, Res>
    where
        F: Fn(Req) -> BoxFuture<'static, Result<Res, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        CircuitBreakerWithFallback::new(self, Arc::new(handler))
    }

    /// Same as [`with_fallback`](Self::with_fallback) for an already shared handler.
    pub fn with_shared_fallback<Req, Res>(
        self,
        handler: Arc<FallbackHandler<Req, Res>>,
    ) -> CircuitBreakerWithFallback<S, Req, Res> {
        CircuitBreakerWithFallback::new(self, handler)
    }

    /// Forces the circuit into the open state.
    pub fn force_open(&self) {
        self.circuit.lock().force_open(&self.config);
    }

    /// Forces the circuit into the closed state.
    pub fn force_closed(&self) {
        self.circuit.lock().force_closed(&self.config);
    }

    /// Closes the circuit and clears the rolling window.
    pub fn reset(&self) {
        self.circuit.lock().reset(&self.config);
    }

    /// Returns the current state, applying the reset timeout first.
    pub fn state(&self) -> CircuitState {
        self.circuit.lock().state(&self.config)
    }

    /// Returns the last recorded state without taking the lock.
    ///
    /// An open circuit whose reset timeout has passed still reads as open
    /// here until the next call or [`state`](Self::state) moves it on.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns a snapshot of the rolling window and state.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().metrics(&self.config)
    }

    /// Returns "healthy" when closed, "degraded" when half-open and
    /// "unhealthy" when open.
    pub fn health_status(&self) -> &'static str {
        match self.state_sync() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }

    /// The breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Runs one call through the breaker without needing `&mut self`.
    pub fn fire<Req>(
        &self,
        req: Req,
    ) -> BoxFuture<'static, Result<S::Response, CircuitBreakerError<S::Error>>>
    where
        S: Service<Req> + Clone + Send + 'static,
        S::Response: Send + 'static,
        S::Error: Send + 'static,
        S::Future: Send + 'static,
        Req: Send + 'static,
    {
        let mut this = self.clone();
        this.call(req)
    }
}

impl<S> Clone for CircuitBreaker<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req> Service<Req> for CircuitBreaker<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<S::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is driven per call through `oneshot`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let inner = self.inner.clone();
        let circuit = Arc::clone(&self.circuit);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let Some(permit) = CallPermit::acquire(circuit, Arc::clone(&config)) else {
                tracing::debug!(breaker = %config.name, "call rejected by open circuit");
                return Err(CircuitBreakerError::OpenCircuit);
            };

            let result = inner.oneshot(req).await;
            permit.settle(result.is_err());
            result.map_err(CircuitBreakerError::Inner)
        })
    }
}
