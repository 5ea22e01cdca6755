use intake_resilience_core::ResilienceError;
use thiserror::Error;

/// Why a retried operation gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed; `last` is the final error.
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: usize,
        /// Error from the final attempt.
        last: E,
    },

    /// The error matched no retryable pattern and was not retried.
    #[error("{0}")]
    NonRetryable(E),
}

impl<E> RetryError<E> {
    /// Returns the underlying operation error.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::NonRetryable(e) => e,
        }
    }

    /// Borrows the underlying operation error.
    pub fn inner(&self) -> &E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::NonRetryable(e) => e,
        }
    }

    /// Returns true if retries ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Number of attempts made.
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::NonRetryable(_) => 1,
        }
    }
}

impl<E> From<RetryError<E>> for ResilienceError<E> {
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => {
                ResilienceError::RetryExhausted { attempts, last }
            }
            RetryError::NonRetryable(e) => ResilienceError::Application(e),
        }
    }
}
