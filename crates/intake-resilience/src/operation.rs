//! Circuit breaker around retry around the raw operation.

use crate::fallback::{FallbackError, FallbackSpec};
use intake_resilience_circuitbreaker::{
    CircuitBreaker, CircuitBreakerError, CircuitBreakerLayer, CircuitBreakerWithFallback,
    CircuitState,
};
use intake_resilience_core::{CallOutcome, ResilienceError};
use intake_resilience_retry::{Retry, RetryError, RetryLayer};
use std::fmt;
use tower::{Layer, Service, ServiceExt};

/// A protected operation: `CircuitBreaker(Retry(operation))`.
///
/// Built with [`ResilientOperationBuilder`].
///
/// The breaker only sees the final outcome of each retried sequence, so a
/// call that fails four times before giving up counts as one failure in the
/// breaker's window.
///
/// Without a fallback, every failure kind reaches the caller as a distinct
/// [`ResilienceError`] variant. With a fallback, [`invoke`](Self::invoke)
/// never fails: the outcome records whether the value came from the
/// operation or from the fallback, and why.
pub struct ResilientOperation<S, Req, Res> {
    breaker: CircuitBreaker<Retry<S>>,
    fallback: Option<CircuitBreakerWithFallback<Retry<S>, Req, Res>>,
}

impl<S, Req, Res> ResilientOperation<S, Req, Res> {
    /// The breaker guarding this operation, for state inspection and manual control.
    pub fn breaker(&self) -> &CircuitBreaker<Retry<S>> {
        &self.breaker
    }

    /// Current breaker state.
    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Returns true if a fallback is attached.
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

impl<S, Req, Res> ResilientOperation<S, Req, Res>
where
    S: Service<Req, Response = Res> + Clone + Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    Res: Send + 'static,
{
    /// Runs one call through the breaker and retry policy.
    pub async fn invoke(&self, args: Req) -> Result<CallOutcome<Res>, ResilienceError<S::Error>> {
        match &self.fallback {
            Some(with_fallback) => match with_fallback.clone().oneshot(args).await {
                Ok(outcome) => Ok(outcome),
                Err(never) => match never {},
            },
            None => self
                .breaker
                .fire(args)
                .await
                .map(CallOutcome::Success)
                .map_err(|err| self.classify(err)),
        }
    }

    /// Like [`invoke`](Self::invoke), but a call that degraded to no value
    /// is reported as [`ResilienceError::FallbackFailed`].
    pub async fn invoke_value(&self, args: Req) -> Result<Res, ResilienceError<S::Error>> {
        match self.invoke(args).await? {
            CallOutcome::Success(value) | CallOutcome::Fallback { value, .. } => Ok(value),
            CallOutcome::Null { cause } => Err(FallbackError::degraded(cause).into()),
        }
    }

    fn classify(&self, err: CircuitBreakerError<RetryError<S::Error>>) -> ResilienceError<S::Error> {
        match err {
            CircuitBreakerError::OpenCircuit => ResilienceError::CircuitOpen {
                name: Some(self.breaker.config().name().to_string()),
            },
            CircuitBreakerError::Inner(RetryError::Exhausted { attempts, last }) => {
                ResilienceError::RetryExhausted { attempts, last }
            }
            CircuitBreakerError::Inner(RetryError::NonRetryable(err)) => {
                ResilienceError::Application(err)
            }
        }
    }
}

impl<S, Req, Res> Clone for ResilientOperation<S, Req, Res>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            breaker: self.breaker.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

/// Builder for [`ResilientOperation`].
pub struct ResilientOperationBuilder<Req, Res> {
    retry: Option<RetryLayer>,
    breaker: Option<CircuitBreakerLayer>,
    fallback: Option<FallbackSpec<Req, Res>>,
}

impl<Req, Res> ResilientOperationBuilder<Req, Res> {
    /// Creates a builder using the default retry policy and breaker.
    pub fn new() -> Self {
        Self {
            retry: None,
            breaker: None,
            fallback: None,
        }
    }

    /// Sets the retry policy applied inside the breaker.
    pub fn retry(mut self, layer: RetryLayer) -> Self {
        self.retry = Some(layer);
        self
    }

    /// Sets the breaker wrapped around the retried operation.
    pub fn breaker(mut self, layer: CircuitBreakerLayer) -> Self {
        self.breaker = Some(layer);
        self
    }

    /// Attaches a fallback.
    pub fn fallback(mut self, spec: FallbackSpec<Req, Res>) -> Self {
        self.fallback = Some(spec);
        self
    }

    /// Wraps `service`.
    pub fn build<S>(self, service: S) -> ResilientOperation<S, Req, Res>
    where
        S: Clone,
        Req: 'static,
        Res: Clone + Send + Sync + 'static,
    {
        let retry = self.retry.unwrap_or_else(|| RetryLayer::builder().build());
        let breaker_layer = self
            .breaker
            .unwrap_or_else(|| CircuitBreakerLayer::builder().build());

        let breaker = breaker_layer.layer(retry.layer(service));
        let fallback = self.fallback.map(|spec| {
            tracing::debug!(breaker = %breaker.config().name(), "fallback attached");
            breaker.clone().with_shared_fallback(spec.into_handler())
        });

        ResilientOperation { breaker, fallback }
    }
}

impl<Req, Res> Default for ResilientOperationBuilder<Req, Res> {
    fn default() -> Self {
        Self::new()
    }
}
