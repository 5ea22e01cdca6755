//! Configuration for the concurrency gate.

use crate::events::GateEvent;
use intake_resilience_core::events::{EventListener, EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`ConcurrencyGate`](crate::ConcurrencyGate).
#[derive(Clone)]
pub struct GateConfig {
    /// Number of slots.
    pub(crate) capacity: usize,
    /// Longest a caller waits for a slot; `None` waits indefinitely.
    pub(crate) max_wait: Option<Duration>,
    /// Name of this gate instance.
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<GateEvent>,
}

impl GateConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder::new()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Name used in events, logs, and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for gate configuration.
pub struct GateConfigBuilder {
    capacity: usize,
    max_wait: Option<Duration>,
    name: String,
    event_listeners: EventListeners<GateEvent>,
}

impl GateConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        crate::describe_metrics();
        Self {
            capacity: 10,
            max_wait: None,
            name: "gate".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the number of slots. Values below 1 are raised to 1.
    ///
    /// Default: 10
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Bounds how long a caller waits for a slot.
    ///
    /// Default: None (wait until a slot frees up)
    pub fn max_wait(mut self, duration: Option<Duration>) -> Self {
        self.max_wait = duration;
        self
    }

    /// Sets the name of this gate instance.
    ///
    /// Default: "gate"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a slot is acquired.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)`: slots now held, and how long the caller waited.
    pub fn on_slot_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GateEvent::SlotAcquired { held, waited, .. } = event {
                f(*held, *waited);
            }
        }));
        self
    }

    /// Registers a callback when a slot is released.
    ///
    /// # Callback Signature
    /// `Fn(Duration)`: how long the slot was held.
    pub fn on_slot_released<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GateEvent::SlotReleased { held_for, .. } = event {
                f(*held_for);
            }
        }));
        self
    }

    /// Registers a callback when a caller gives up waiting.
    pub fn on_wait_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, GateEvent::WaitTimedOut { .. }) {
                f();
            }
        }));
        self
    }

    /// Adds an arbitrary listener.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<GateEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> GateConfig {
        GateConfig {
            capacity: self.capacity,
            max_wait: self.max_wait,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds a gate.
    pub fn build(self) -> crate::ConcurrencyGate {
        crate::ConcurrencyGate::new(self.build_config())
    }
}

impl Default for GateConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
