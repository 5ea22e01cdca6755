//! Fixed-capacity concurrency gate.
//!
//! A [`ConcurrencyGate`] owns N slots backed by a tokio semaphore, so waiters
//! are served in arrival order. A slot is an RAII guard: it goes back to the
//! gate when dropped, whether the work finished, failed, panicked, or the
//! waiting future was cancelled.
//!
//! # Basic Example
//!
//! ```rust
//! use intake_resilience_gate::GateConfig;
//!
//! # async fn example() {
//! let gate = GateConfig::builder()
//!     .capacity(4)
//!     .name("uploads")
//!     .on_slot_acquired(|held, waited| {
//!         println!("{held} slots held, waited {waited:?}");
//!     })
//!     .build();
//!
//! let stored = gate.run(async { "a.pdf stored" }).await.unwrap();
//! assert_eq!(stored, "a.pdf stored");
//! assert_eq!(gate.held(), 0);
//! # }
//! ```
//!
//! # As middleware
//!
//! [`GateLayer`] puts any service behind a shared gate. The inner service's
//! error type must be constructible from [`GateError`]:
//!
//! ```rust
//! use intake_resilience_gate::{ConcurrencyGate, GateError, GateLayer};
//! use tower::ServiceBuilder;
//!
//! #[derive(Debug)]
//! struct StoreError;
//!
//! impl From<GateError> for StoreError {
//!     fn from(_: GateError) -> Self {
//!         StoreError
//!     }
//! }
//!
//! let service = ServiceBuilder::new()
//!     .layer(GateLayer::new(ConcurrencyGate::with_capacity(8)))
//!     .service_fn(|name: String| async move { Ok::<_, StoreError>(name) });
//! ```

pub mod config;
pub mod error;
pub mod events;
mod gate;
pub mod layer;
pub mod service;

pub use config::{GateConfig, GateConfigBuilder};
pub use error::{GateError, Result};
pub use events::GateEvent;
pub use gate::{ConcurrencyGate, ConcurrencySlot};
pub use layer::GateLayer;
pub use service::Gated;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

pub(crate) fn describe_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        describe_counter!("gate_acquisitions_total", "Slots handed out by the gate");
        describe_counter!(
            "gate_wait_timeouts_total",
            "Callers that gave up waiting for a slot"
        );
        describe_gauge!("gate_slots_held", "Slots currently held");
        describe_histogram!("gate_wait_seconds", "Time spent queued for a slot");
    });
}
