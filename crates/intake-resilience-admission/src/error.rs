use crate::identity::Identity;
use intake_resilience_core::ResilienceError;
use std::time::Duration;

/// An arrival was rejected because its identity spent the window's budget.
///
/// Carries everything a transport needs for a `429` with `Retry-After`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{identity} reached {limit} requests per {window:?}, retry after {retry_after:?}")]
pub struct Throttled {
    /// Identity the arrival was charged to.
    pub identity: Identity,
    /// Budget in effect for this arrival.
    pub limit: usize,
    /// Window length.
    pub window: Duration,
    /// Time until the window rolls over.
    pub retry_after: Duration,
}

impl<E> From<Throttled> for ResilienceError<E> {
    fn from(err: Throttled) -> Self {
        ResilienceError::Throttled {
            identity: err.identity.to_string(),
            limit: err.limit,
            window: err.window,
            retry_after: err.retry_after,
        }
    }
}
