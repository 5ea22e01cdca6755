use crate::events::LoadLimitEvent;
use crate::probe::LoadSample;
use intake_resilience_core::events::{EventListener, EventListeners, FnListener};
use std::time::Duration;

/// Configuration for [`AdaptiveLimitCache`](crate::AdaptiveLimitCache).
pub struct AdaptiveLimitConfig {
    pub(crate) base_limit: usize,
    pub(crate) cpu_threshold_percent: f64,
    pub(crate) memory_threshold_percent: f64,
    pub(crate) high_load_factor: f64,
    pub(crate) cache_duration: Duration,
    pub(crate) event_listeners: EventListeners<LoadLimitEvent>,
    pub(crate) name: String,
}

impl AdaptiveLimitConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> AdaptiveLimitConfigBuilder {
        AdaptiveLimitConfigBuilder::new()
    }

    /// Budget when the host is not under load.
    pub fn base_limit(&self) -> usize {
        self.base_limit
    }

    /// How long a computed limit is reused.
    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    /// Returns true if either utilization is strictly above its threshold.
    pub fn is_high_load(&self, sample: &LoadSample) -> bool {
        sample.cpu_percent > self.cpu_threshold_percent
            || sample.memory_percent > self.memory_threshold_percent
    }

    /// The budget implied by `sample`. Never below 1.
    pub fn limit_for(&self, sample: &LoadSample) -> usize {
        if self.is_high_load(sample) {
            let reduced = (self.base_limit as f64 * self.high_load_factor).floor();
            (reduced as usize).max(1)
        } else {
            self.base_limit
        }
    }
}

/// Builder for [`AdaptiveLimitConfig`].
pub struct AdaptiveLimitConfigBuilder {
    base_limit: usize,
    cpu_threshold_percent: f64,
    memory_threshold_percent: f64,
    high_load_factor: f64,
    cache_duration: Duration,
    event_listeners: EventListeners<LoadLimitEvent>,
    name: String,
}

impl AdaptiveLimitConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        crate::describe_metrics();
        Self {
            base_limit: 100,
            cpu_threshold_percent: 80.0,
            memory_threshold_percent: 85.0,
            high_load_factor: 0.5,
            cache_duration: Duration::from_secs(5),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Budget per identity and window when the host is healthy.
    ///
    /// Values below 1 are raised to 1.
    ///
    /// Default: 100
    pub fn base_limit(mut self, limit: usize) -> Self {
        self.base_limit = limit.max(1);
        self
    }

    /// CPU utilization above which the host counts as loaded.
    ///
    /// Default: 80.0
    pub fn cpu_threshold_percent(mut self, percent: f64) -> Self {
        self.cpu_threshold_percent = percent;
        self
    }

    /// Memory utilization above which the host counts as loaded.
    ///
    /// Default: 85.0
    pub fn memory_threshold_percent(mut self, percent: f64) -> Self {
        self.memory_threshold_percent = percent;
        self
    }

    /// Multiplier applied to the base limit under load.
    ///
    /// Default: 0.5
    pub fn high_load_factor(mut self, factor: f64) -> Self {
        self.high_load_factor = factor;
        self
    }

    /// How long a computed limit stays valid.
    ///
    /// Default: 5 seconds
    pub fn cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    /// Name used in events, logs, and metric labels.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for every freshly computed limit.
    ///
    /// # Callback Signature
    /// `Fn(usize, bool)`: the new limit and whether the host was under load.
    pub fn on_limit_computed<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LoadLimitEvent::LimitComputed {
                limit, high_load, ..
            } = event
            {
                f(*limit, *high_load);
            }
        }));
        self
    }

    /// Registers a callback when the probe fails.
    pub fn on_probe_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LoadLimitEvent::ProbeFailed { reason, .. } = event {
                f(reason);
            }
        }));
        self
    }

    /// Adds an arbitrary listener.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<LoadLimitEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> AdaptiveLimitConfig {
        AdaptiveLimitConfig {
            base_limit: self.base_limit,
            cpu_threshold_percent: self.cpu_threshold_percent,
            memory_threshold_percent: self.memory_threshold_percent,
            high_load_factor: self.high_load_factor,
            cache_duration: self.cache_duration,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for AdaptiveLimitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
