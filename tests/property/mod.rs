//! Property-based tests for the intake resilience components.
//!
//! Run with: cargo test --test property_tests

pub mod admission;
pub mod gate;
pub mod retry;

use tokio::runtime::{Builder, Runtime};

/// A current-thread runtime whose clock only moves when every task is idle,
/// so backoff and window timers resolve instantly.
pub fn paused_runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}
