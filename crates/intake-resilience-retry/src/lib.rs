//! Bounded exponential backoff with a retryable-error filter.
//!
//! An operation gets up to `max_retries + 1` attempts. Before retry *k* the
//! policy waits `min(initial_delay * backoff_factor^(k-1), max_delay)`; the
//! first attempt runs immediately. When retryable patterns are configured,
//! an error is retried only if its `Display` text contains one of the literal
//! patterns or matches one of the regular expressions. Anything else is
//! returned at once as [`RetryError::NonRetryable`].
//!
//! The policy is available as a plain async function, [`retry_with_backoff`],
//! and as a Tower middleware, [`Retry`] / [`RetryLayer`].
//!
//! # Examples
//!
//! ```
//! use intake_resilience_retry::{retry_with_backoff, RetryConfig, RetryablePattern};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = RetryConfig::builder()
//!     .name("scanner")
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .backoff_factor(2.0)
//!     .max_delay(Duration::from_secs(2))
//!     .retryable_pattern("ECONNRESET")
//!     .retryable_pattern(RetryablePattern::regex(r"HTTP 5\d\d").unwrap())
//!     .on_retry(|attempt, delay| {
//!         println!("attempt {attempt} failed, waiting {delay:?}");
//!     })
//!     .build_config();
//!
//! let result = retry_with_backoff(|| async { Ok::<_, std::io::Error>(42) }, &config).await;
//! assert_eq!(result.unwrap(), 42);
//! # }
//! ```

mod backoff;
mod config;
mod error;
mod events;
mod layer;
mod pattern;

pub use backoff::{ExponentialBackoff, FnInterval, IntervalFunction};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use pattern::RetryablePattern;

use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

pub(crate) fn describe_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "retry_calls_total",
            "Retried operations by final outcome"
        );
        describe_counter!(
            "retry_attempts_total",
            "Retries performed after a failed attempt"
        );
    });
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// uses up `config.max_retries()` retries.
///
/// `operation` is called once per attempt, so it must be able to produce a
/// fresh future each time.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(retry = %config.name, attempts = attempt, "operation succeeded after retries");
                }
                config.event_listeners.emit(&RetryEvent::Success {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt,
                });

                #[cfg(feature = "metrics")]
                counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "success").increment(1);

                return Ok(value);
            }
            Err(error) => error,
        };

        if !config.is_retryable(&error) {
            tracing::debug!(
                retry = %config.name,
                attempt,
                error = %error,
                "error is not retryable"
            );
            config.event_listeners.emit(&RetryEvent::IgnoredError {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt,
            });

            #[cfg(feature = "metrics")]
            counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "non_retryable").increment(1);

            return Err(RetryError::NonRetryable(error));
        }

        if attempt > config.max_retries {
            tracing::warn!(
                retry = %config.name,
                attempts = attempt,
                error = %error,
                "retries exhausted"
            );
            config.event_listeners.emit(&RetryEvent::Exhausted {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                attempts: attempt,
            });

            #[cfg(feature = "metrics")]
            counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "exhausted").increment(1);

            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let delay = config.delay_before_retry(attempt);
        tracing::debug!(
            retry = %config.name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "attempt failed, backing off"
        );
        config.event_listeners.emit(&RetryEvent::Retry {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            attempt,
            delay,
        });

        #[cfg(feature = "metrics")]
        counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// A Tower [`Service`] that retries failed requests.
///
/// Each attempt runs on a fresh clone of the inner service with a clone of
/// the request.
pub struct Retry<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S> Retry<S> {
    /// Creates a new `Retry` service wrapping the given service.
    pub fn new(inner: S, config: Arc<RetryConfig>) -> Self {
        Self { inner, config }
    }

    /// The configuration applied by this service.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<S: Clone> Clone for Retry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req> Service<Req> for Retry<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = RetryError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Each attempt drives readiness of its own clone via `oneshot`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let inner = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            retry_with_backoff(move || inner.clone().oneshot(req.clone()), &config).await
        })
    }
}
