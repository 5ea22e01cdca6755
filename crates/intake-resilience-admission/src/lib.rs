//! Per-identity admission control over fixed windows.
//!
//! Every arrival is charged to an [`Identity`]: the authenticated principal
//! when there is one, else the peer address. Within a fixed window each
//! identity may be admitted up to the current budget; the next arrival is
//! rejected with [`Throttled`], which carries the budget, the window and a
//! retry-after hint. All counts drop to zero when the window ends.
//!
//! The budget is read from a [`LimitSource`] per arrival. Pair the controller
//! with an [`AdaptiveLimitCache`](intake_resilience_loadlimit::AdaptiveLimitCache)
//! to shrink budgets while the host is under load, or use [`FixedLimit`].
//!
//! # Basic Example
//!
//! ```rust
//! use intake_resilience_admission::{AdmissionController, Identity};
//! use intake_resilience_loadlimit::FixedLimit;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let admission = AdmissionController::builder()
//!     .window(Duration::from_secs(60))
//!     .name("uploads")
//!     .on_throttled(|identity, retry_after| {
//!         println!("{identity} throttled, retry in {retry_after:?}");
//!     })
//!     .build(FixedLimit(100));
//!
//! let caller = Identity::Principal("u-17".into());
//! match admission.admit(&caller).await {
//!     Ok(granted) => println!("{} left in this window", granted.remaining),
//!     Err(throttled) => println!("rejected: {throttled}"),
//! }
//! # }
//! ```
//!
//! # Metrics
//!
//! With the `metrics` feature:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `admission_requests_total` | Counter | `admission`, `identity_kind`, `result` | Arrivals by outcome (`admitted` or `throttled`) |
//! | `admission_tracked_identities` | Gauge | `admission` | Identities charged in the active window |

mod config;
mod controller;
mod error;
mod events;
mod identity;
mod layer;
mod window;

pub use config::{AdmissionConfig, AdmissionConfigBuilder};
pub use controller::{Admission, AdmissionController, Usage};
pub use error::Throttled;
pub use events::AdmissionEvent;
pub use identity::Identity;
pub use intake_resilience_loadlimit::{FixedLimit, LimitSource};
pub use layer::{AdmissionLayer, Admitted};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

pub(crate) fn describe_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "admission_requests_total",
            "Arrivals seen by the admission controller, by outcome"
        );
        describe_gauge!(
            "admission_tracked_identities",
            "Identities charged in the active admission window"
        );
    });
}
