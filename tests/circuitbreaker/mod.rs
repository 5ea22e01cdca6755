//! Test organization:
//! - thresholds.rs: strict threshold, volume threshold, rolling window expiry
//! - half_open.rs: single trial, trial outcomes, cancelled trials
//! - fallback.rs: fallback causes and degraded calls
//! - control.rs: manual control and observability

mod fallback;
mod half_open;
mod thresholds;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A service whose outcome can be flipped between calls, counting invocations.
#[derive(Clone)]
pub struct Switchable {
    pub failing: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
}

impl Switchable {
    pub fn new(failing: bool) -> Self {
        Self {
            failing: Arc::new(AtomicBool::new(failing)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn service(
        &self,
    ) -> impl tower::Service<u32, Response = u32, Error = &'static str, Future: Send>
    + Clone
    + Send
    + 'static {
        let this = self.clone();
        tower::service_fn(move |req: u32| {
            this.calls.fetch_add(1, Ordering::SeqCst);
            let failing = this.failing.load(Ordering::SeqCst);
            async move { if failing { Err("upstream failed") } else { Ok(req) } }
        })
    }
}
