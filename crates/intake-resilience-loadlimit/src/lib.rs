//! Host-load adaptive admission budget.
//!
//! [`AdaptiveLimitCache`] samples CPU and memory utilization through a
//! [`LoadProbe`] and turns the sample into a budget: the configured base limit
//! on a healthy host, or `max(1, floor(base * high_load_factor))` when either
//! utilization is above its threshold. The result is cached for a fixed TTL
//! and recomputed by a single caller at a time.
//!
//! # Example
//!
//! ```rust
//! use intake_resilience_loadlimit::{AdaptiveLimitCache, AdaptiveLimitConfig, SystemLoadProbe};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache = AdaptiveLimitCache::new(
//!     AdaptiveLimitConfig::builder()
//!         .name("uploads")
//!         .base_limit(100)
//!         .cpu_threshold_percent(80.0)
//!         .memory_threshold_percent(85.0)
//!         .high_load_factor(0.5)
//!         .cache_duration(Duration::from_secs(5))
//!         .build(),
//!     SystemLoadProbe::new(),
//! );
//!
//! let budget = cache.current_limit().await;
//! assert!(budget >= 1);
//! # }
//! ```
//!
//! # Failure handling
//!
//! A failing probe never reaches the caller. The error is logged, the base
//! limit is returned, and nothing is cached, so the next call samples again.
//!
//! # Metrics
//!
//! With the `metrics` feature enabled:
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `loadlimit_probes_total` | Counter | `loadlimit`, `outcome` (`ok`, `failed`) |
//! | `loadlimit_current_limit` | Gauge | `loadlimit` |

mod cache;
mod config;
mod events;
mod probe;

pub use cache::{AdaptiveLimitCache, CachedLimit, FixedLimit, LimitSource};
pub use config::{AdaptiveLimitConfig, AdaptiveLimitConfigBuilder};
pub use events::LoadLimitEvent;
pub use probe::{LoadProbe, LoadProbeError, LoadSample, SystemLoadProbe};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

pub(crate) fn describe_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        describe_counter!("loadlimit_probes_total", "Host load samples by outcome");
        describe_gauge!(
            "loadlimit_current_limit",
            "Admission budget from the latest successful sample"
        );
    });
}
