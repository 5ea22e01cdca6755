//! Error taxonomy for the intake resilience stack.
//!
//! Each component has its own narrow error type (`CircuitBreakerError`,
//! `RetryError`, `Throttled`, ...). All of them convert into
//! [`ResilienceError<E>`], where `E` is the error of the protected operation,
//! so callers that compose several components handle one type:
//!
//! ```rust
//! use intake_resilience_core::ResilienceError;
//! use std::time::Duration;
//!
//! fn status_for(err: &ResilienceError<std::io::Error>) -> u16 {
//!     match err {
//!         ResilienceError::Throttled { .. } => 429,
//!         ResilienceError::CircuitOpen { .. } => 503,
//!         ResilienceError::RetryExhausted { .. } => 502,
//!         _ => 500,
//!     }
//! }
//!
//! let err: ResilienceError<std::io::Error> = ResilienceError::Throttled {
//!     identity: "user:42".into(),
//!     limit: 10,
//!     window: Duration::from_secs(60),
//!     retry_after: Duration::from_secs(12),
//! };
//! assert_eq!(status_for(&err), 429);
//! ```

use std::time::Duration;

/// Type-erased error used for fallback handlers and probe failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every failure the resilience stack can hand back to a caller.
#[derive(Debug, thiserror::Error)]
pub enum ResilienceError<E> {
    /// Admission rejected the arrival; carries the budget actually applied.
    #[error("throttled: {identity} reached {limit} requests per {window:?}, retry after {retry_after:?}")]
    Throttled {
        /// Identity the budget was charged to.
        identity: String,
        /// Budget in effect when the arrival was rejected.
        limit: usize,
        /// Length of the fixed admission window.
        window: Duration,
        /// Time left until the window rolls over.
        retry_after: Duration,
    },

    /// The circuit breaker short-circuited the call.
    #[error("circuit breaker {} is open", .name.as_deref().unwrap_or("<unnamed>"))]
    CircuitOpen {
        /// Breaker instance name.
        name: Option<String>,
    },

    /// Every permitted attempt failed; `last` is the last failure observed.
    #[error("operation failed after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Total attempts made, including the first.
        attempts: usize,
        /// Last underlying failure.
        last: E,
    },

    /// A fallback handler failed while servicing a failed call.
    #[error("fallback failed: {reason}")]
    FallbackFailed {
        /// Rendered handler error.
        reason: String,
    },

    /// The host load probe could not produce a sample.
    #[error("load metrics unavailable: {reason}")]
    MetricsUnavailable {
        /// Rendered probe error.
        reason: String,
    },

    /// The protected operation failed with an error that was not retried.
    #[error("application error: {0}")]
    Application(E),
}

impl<E> ResilienceError<E> {
    /// Returns `true` for admission rejections.
    pub fn is_throttled(&self) -> bool {
        matches!(self, ResilienceError::Throttled { .. })
    }

    /// Returns `true` when the breaker short-circuited the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns `true` when retries ran out.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, ResilienceError::RetryExhausted { .. })
    }

    /// Returns `true` for a non-retried application error.
    pub fn is_application(&self) -> bool {
        matches!(self, ResilienceError::Application(_))
    }

    /// The underlying operation error, if this failure carries one.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            ResilienceError::RetryExhausted { last, .. } => Some(last),
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the operation error type, keeping the failure kind.
    pub fn map_operation<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::Throttled {
                identity,
                limit,
                window,
                retry_after,
            } => ResilienceError::Throttled {
                identity,
                limit,
                window,
                retry_after,
            },
            ResilienceError::CircuitOpen { name } => ResilienceError::CircuitOpen { name },
            ResilienceError::RetryExhausted { attempts, last } => ResilienceError::RetryExhausted {
                attempts,
                last: f(last),
            },
            ResilienceError::FallbackFailed { reason } => {
                ResilienceError::FallbackFailed { reason }
            }
            ResilienceError::MetricsUnavailable { reason } => {
                ResilienceError::MetricsUnavailable { reason }
            }
            ResilienceError::Application(e) => ResilienceError::Application(f(e)),
        }
    }
}
