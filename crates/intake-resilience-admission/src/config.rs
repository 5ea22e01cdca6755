use crate::events::AdmissionEvent;
use crate::identity::Identity;
use intake_resilience_core::events::{EventListener, EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the admission controller.
pub struct AdmissionConfig {
    pub(crate) window: Duration,
    pub(crate) event_listeners: EventListeners<AdmissionEvent>,
    pub(crate) name: String,
}

impl AdmissionConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> AdmissionConfigBuilder {
        AdmissionConfigBuilder::new()
    }

    /// Length of each fixed window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Name used in events, logs, and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`AdmissionConfig`].
pub struct AdmissionConfigBuilder {
    window: Duration,
    event_listeners: EventListeners<AdmissionEvent>,
    name: String,
}

impl Default for AdmissionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - window: 60 seconds
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        crate::describe_metrics();
        Self {
            window: Duration::from_secs(60),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the window length. Every identity's count drops to zero when a
    /// window ends. Zero is raised to one millisecond.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window.max(Duration::from_millis(1));
        self
    }

    /// Gives this controller a name for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when an arrival is admitted.
    ///
    /// # Callback Signature
    /// `Fn(&Identity, usize)`: the identity and its remaining budget.
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&Identity, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::Admitted {
                identity, remaining, ..
            } = event
            {
                f(identity, *remaining);
            }
        }));
        self
    }

    /// Registers a callback when an arrival is throttled.
    ///
    /// # Callback Signature
    /// `Fn(&Identity, Duration)`: the identity and its retry-after hint.
    pub fn on_throttled<F>(mut self, f: F) -> Self
    where
        F: Fn(&Identity, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::Throttled {
                identity,
                retry_after,
                ..
            } = event
            {
                f(identity, *retry_after);
            }
        }));
        self
    }

    /// Registers a callback when a window ends.
    pub fn on_window_rolled<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let AdmissionEvent::WindowRolled { identities, .. } = event {
                f(*identities);
            }
        }));
        self
    }

    /// Adds an arbitrary listener.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<AdmissionEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> AdmissionConfig {
        AdmissionConfig {
            window: self.window,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds a controller drawing its budget from `limits`.
    pub fn build<L>(self, limits: L) -> crate::AdmissionController
    where
        L: intake_resilience_loadlimit::LimitSource,
    {
        crate::AdmissionController::new(limits, self.build_config())
    }
}
