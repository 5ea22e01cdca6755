//! Tower layer implementation for the concurrency gate.

use crate::gate::ConcurrencyGate;
use crate::service::Gated;
use tower::Layer;

/// Layer that puts services behind a shared [`ConcurrencyGate`].
///
/// Every service produced by the same layer draws from the same slots.
#[derive(Clone, Debug)]
pub struct GateLayer {
    gate: ConcurrencyGate,
}

impl GateLayer {
    /// Creates a layer sharing `gate`.
    pub fn new(gate: ConcurrencyGate) -> Self {
        Self { gate }
    }

    /// Creates a new builder; `build()` on it yields the gate itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_resilience_gate::GateLayer;
    ///
    /// let layer = GateLayer::new(GateLayer::builder().capacity(4).name("uploads").build());
    /// assert_eq!(layer.gate().capacity(), 4);
    /// ```
    pub fn builder() -> crate::GateConfigBuilder {
        crate::GateConfigBuilder::new()
    }

    /// The shared gate.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = Gated<S>;

    fn layer(&self, service: S) -> Self::Service {
        Gated::new(service, self.gate.clone())
    }
}
