//! Fixed-window counters.

use crate::identity::Identity;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Per-identity counts for the active window.
///
/// Windows are aligned to the instant the state was created: if several
/// windows pass without traffic, the start jumps ahead by whole multiples
/// of the window length rather than to the arrival time.
#[derive(Debug)]
pub(crate) struct WindowState {
    length: Duration,
    started: Instant,
    counts: HashMap<Identity, usize>,
}

impl WindowState {
    pub(crate) fn new(length: Duration) -> Self {
        Self {
            length,
            started: Instant::now(),
            counts: HashMap::new(),
        }
    }

    /// Advances to the window containing `now`. Returns true if the previous
    /// window ended, in which case every count was dropped.
    pub(crate) fn roll(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.length {
            return false;
        }
        let length = self.length.as_nanos().max(1);
        let whole = elapsed.as_nanos() / length;
        let skip = u64::try_from(whole * length).unwrap_or(u64::MAX);
        self.started += Duration::from_nanos(skip);
        self.counts.clear();
        true
    }

    /// Time left in the active window.
    pub(crate) fn reset_after(&self, now: Instant) -> Duration {
        self.length
            .saturating_sub(now.saturating_duration_since(self.started))
    }

    pub(crate) fn count(&self, identity: &Identity) -> usize {
        self.counts.get(identity).copied().unwrap_or(0)
    }

    /// Charges one arrival if the identity is under `limit`. Returns the new
    /// count, or `None` when the budget is spent.
    pub(crate) fn try_charge(&mut self, identity: &Identity, limit: usize) -> Option<usize> {
        let count = self.counts.entry(identity.clone()).or_insert(0);
        if *count >= limit {
            return None;
        }
        *count += 1;
        Some(*count)
    }

    pub(crate) fn tracked(&self) -> usize {
        self.counts.len()
    }

    pub(crate) fn clear(&mut self, now: Instant) {
        self.started = now;
        self.counts.clear();
    }

    pub(crate) fn length(&self) -> Duration {
        self.length
    }
}
