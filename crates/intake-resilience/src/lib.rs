//! Adaptive admission control and resilient execution for file-intake
//! backends.
//!
//! Each component lives in its own crate and is re-exported here:
//!
//! - [`loadlimit`]: host-load adaptive budget with a TTL cache
//! - [`admission`]: per-identity fixed-window admission against that budget
//! - [`gate`]: fixed-capacity FIFO concurrency gate
//! - [`circuitbreaker`]: rolling-window breaker with a single half-open trial
//! - [`retry`]: exponential backoff restricted to retryable errors
//!
//! This crate composes them. A [`ResilientOperation`] is a breaker around a
//! retry policy around the raw operation, with an optional [`FallbackSpec`].
//! A [`BatchRunner`] runs many calls of one operation through a gate and
//! reports successes and fallback-serviced items separately.
//!
//! # Request path
//!
//! ```text
//! arrival -> admission (budget from loadlimit) -> gate slot
//!         -> breaker -> retry -> operation -> value | fallback | error
//! ```
//!
//! # Example
//!
//! ```rust
//! use intake_resilience::{BatchRunner, FallbackSpec, IntakeConfig, ResilientOperationBuilder};
//! use tower::service_fn;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IntakeConfig::default();
//!
//! let scan = ResilientOperationBuilder::<String, String>::new()
//!     .retry(config.retry()?.name("scan").build())
//!     .breaker(config.circuit_breaker().name("scan").build())
//!     .fallback(FallbackSpec::Static("pending".to_string()))
//!     .build(service_fn(|file: String| async move {
//!         if file.ends_with(".zip") {
//!             Err("archive scanning unavailable")
//!         } else {
//!             Ok(format!("{file}: clean"))
//!         }
//!     }));
//!
//! let runner = BatchRunner::new(config.gate().name("scan").build());
//! let files = vec!["a.pdf".to_string(), "b.zip".to_string()];
//! let report = runner.run(&scan, files).await;
//! println!(
//!     "{} scanned, {} pending",
//!     report.succeeded, report.fallback
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `metrics`: enables the `metrics` facade in every component crate.

pub use intake_resilience_admission as admission;
pub use intake_resilience_circuitbreaker as circuitbreaker;
pub use intake_resilience_core as core;
pub use intake_resilience_gate as gate;
pub use intake_resilience_loadlimit as loadlimit;
pub use intake_resilience_retry as retry;

mod batch;
pub mod config;
mod fallback;
pub mod observability;
mod operation;

pub use batch::{BatchItemError, BatchReport, BatchRunner, ItemOutcome};
pub use config::{ConfigError, IntakeConfig};
pub use fallback::{FallbackError, FallbackSpec};
pub use intake_resilience_core::{CallOutcome, FailureCause, ResilienceError};
pub use operation::{ResilientOperation, ResilientOperationBuilder};
