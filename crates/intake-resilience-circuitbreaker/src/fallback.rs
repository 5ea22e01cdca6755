use crate::events::CircuitBreakerEvent;
use crate::CircuitBreaker;
use futures::future::BoxFuture;
use intake_resilience_core::{BoxError, CallOutcome, FailureCause};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Alternative computation run when the primary call does not succeed.
pub type FallbackHandler<Req, Res> =
    dyn Fn(Req) -> BoxFuture<'static, Result<Res, BoxError>> + Send + Sync;

/// A circuit breaker whose every call resolves to a [`CallOutcome`].
///
/// Created with [`CircuitBreaker::with_fallback`]. Breaker state and
/// inspection methods are reachable through [`breaker`](Self::breaker).
pub struct CircuitBreakerWithFallback<S, Req, Res> {
    breaker: CircuitBreaker<S>,
    handler: Arc<FallbackHandler<Req, Res>>,
}

impl<S, Req, Res> CircuitBreakerWithFallback<S, Req, Res> {
    pub(crate) fn new(breaker: CircuitBreaker<S>, handler: Arc<FallbackHandler<Req, Res>>) -> Self {
        Self { breaker, handler }
    }

    /// The wrapped breaker.
    pub fn breaker(&self) -> &CircuitBreaker<S> {
        &self.breaker
    }
}

impl<S, Req, Res> Clone for CircuitBreakerWithFallback<S, Req, Res>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            breaker: self.breaker.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S, Req, Res> Service<Req> for CircuitBreakerWithFallback<S, Req, Res>
where
    S: Service<Req, Response = Res> + Clone + Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    Res: Send + 'static,
{
    type Response = CallOutcome<Res>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<CallOutcome<Res>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let fallback_args = req.clone();
        let primary = self.breaker.fire(req);
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.breaker.config);

        Box::pin(async move {
            let err = match primary.await {
                Ok(value) => return Ok(CallOutcome::Success(value)),
                Err(err) => err,
            };

            let cause = if err.is_circuit_open() {
                FailureCause::CircuitOpen
            } else {
                FailureCause::CallFailed
            };
            tracing::debug!(
                breaker = %config.name,
                cause = cause.as_str(),
                error = %err,
                "invoking fallback"
            );
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::FallbackInvoked {
                    pattern_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    cause,
                });

            match handler(fallback_args).await {
                Ok(value) => {
                    #[cfg(feature = "metrics")]
                    counter!("circuitbreaker_fallbacks_total", "circuitbreaker" => config.name.clone(), "outcome" => "value").increment(1);

                    Ok(CallOutcome::Fallback { value, cause })
                }
                Err(fallback_err) => {
                    tracing::error!(
                        breaker = %config.name,
                        cause = cause.as_str(),
                        error = %fallback_err,
                        "fallback failed, call degraded to no result"
                    );
                    config
                        .event_listeners
                        .emit(&CircuitBreakerEvent::FallbackFailed {
                            pattern_name: config.name.clone(),
                            timestamp: std::time::Instant::now(),
                            cause,
                            reason: fallback_err.to_string(),
                        });

                    #[cfg(feature = "metrics")]
                    counter!("circuitbreaker_fallbacks_total", "circuitbreaker" => config.name.clone(), "outcome" => "null").increment(1);

                    Ok(CallOutcome::Null { cause })
                }
            }
        })
    }
}
