use crate::backoff::{ExponentialBackoff, IntervalFunction};
use crate::events::RetryEvent;
use crate::pattern::RetryablePattern;
use intake_resilience_core::{EventListener, EventListeners, FnListener};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for retrying an operation.
pub struct RetryConfig {
    pub(crate) max_retries: usize,
    pub(crate) interval: Arc<dyn IntervalFunction>,
    pub(crate) retryable_patterns: Vec<RetryablePattern>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// The configured filter; empty means every error is retryable.
    pub fn retryable_patterns(&self) -> &[RetryablePattern] {
        &self.retryable_patterns
    }

    /// Name used in events, logs, and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait before retry number `retry` (1-based).
    pub fn delay_before_retry(&self, retry: usize) -> Duration {
        self.interval.next_interval(retry.saturating_sub(1))
    }

    /// Returns true if `error` may be retried.
    pub fn is_retryable<E: fmt::Display + ?Sized>(&self, error: &E) -> bool {
        if self.retryable_patterns.is_empty() {
            return true;
        }
        let message = error.to_string();
        self.retryable_patterns
            .iter()
            .any(|pattern| pattern.matches(&message))
    }

    /// Wraps this configuration in a layer.
    pub fn layer(self) -> crate::RetryLayer {
        crate::RetryLayer::new(self)
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_retries: usize,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    interval: Option<Arc<dyn IntervalFunction>>,
    retryable_patterns: Vec<RetryablePattern>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        crate::describe_metrics();
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            interval: None,
            retryable_patterns: Vec::new(),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many times a failed attempt may be retried.
    ///
    /// Total attempts are `max_retries + 1`.
    ///
    /// Default: 3
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the wait before the first retry.
    ///
    /// Default: 100 ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the cap on any single wait.
    ///
    /// Default: 10 seconds
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor between consecutive waits.
    ///
    /// Waits never shrink: factors below 1.0 (and non-finite values) are
    /// treated as 1.0, so every retry waits `initial_delay`.
    ///
    /// Default: 2.0
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Replaces the exponential schedule with a custom interval function.
    pub fn backoff<I>(mut self, interval: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval = Some(Arc::new(interval));
        self
    }

    /// Adds one retryable pattern.
    ///
    /// Once any pattern is configured, only matching errors are retried.
    pub fn retryable_pattern(mut self, pattern: impl Into<RetryablePattern>) -> Self {
        self.retryable_patterns.push(pattern.into());
        self
    }

    /// Adds several retryable patterns.
    pub fn retryable_patterns<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<RetryablePattern>,
    {
        self.retryable_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Gives this policy a name for events, logs, and metrics.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback before every retry.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)`: the attempt that failed and the wait before the next one.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback on success with the number of attempts it took.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when retries run out.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when an error is not retryable.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RetryEvent::IgnoredError { .. }) {
                f();
            }
        }));
        self
    }

    /// Adds an arbitrary listener.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<RetryEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> RetryConfig {
        let interval = self.interval.unwrap_or_else(|| {
            Arc::new(
                ExponentialBackoff::new(self.initial_delay)
                    .multiplier(self.backoff_factor)
                    .max_interval(self.max_delay),
            )
        });
        RetryConfig {
            max_retries: self.max_retries,
            interval,
            retryable_patterns: self.retryable_patterns,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the retry layer.
    pub fn build(self) -> crate::RetryLayer {
        crate::RetryLayer::new(self.build_config())
    }
}
