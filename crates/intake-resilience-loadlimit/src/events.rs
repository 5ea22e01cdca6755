use intake_resilience_core::events::ResilienceEvent;
use std::time::Instant;

/// Events emitted by the adaptive limit cache.
#[derive(Debug, Clone)]
pub enum LoadLimitEvent {
    /// A fresh cached limit was served.
    CacheHit {
        pattern_name: String,
        timestamp: Instant,
        limit: usize,
    },
    /// The cache was stale but another caller was already recomputing it.
    RecomputeInFlight {
        pattern_name: String,
        timestamp: Instant,
        served_limit: usize,
    },
    /// A sample was taken and a new limit cached.
    LimitComputed {
        pattern_name: String,
        timestamp: Instant,
        limit: usize,
        cpu_percent: f64,
        memory_percent: f64,
        high_load: bool,
    },
    /// Sampling failed; the base limit was served and nothing was cached.
    ProbeFailed {
        pattern_name: String,
        timestamp: Instant,
        reason: String,
    },
}

impl ResilienceEvent for LoadLimitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoadLimitEvent::CacheHit { .. } => "CacheHit",
            LoadLimitEvent::RecomputeInFlight { .. } => "RecomputeInFlight",
            LoadLimitEvent::LimitComputed { .. } => "LimitComputed",
            LoadLimitEvent::ProbeFailed { .. } => "ProbeFailed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LoadLimitEvent::CacheHit { timestamp, .. }
            | LoadLimitEvent::RecomputeInFlight { timestamp, .. }
            | LoadLimitEvent::LimitComputed { timestamp, .. }
            | LoadLimitEvent::ProbeFailed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            LoadLimitEvent::CacheHit { pattern_name, .. }
            | LoadLimitEvent::RecomputeInFlight { pattern_name, .. }
            | LoadLimitEvent::LimitComputed { pattern_name, .. }
            | LoadLimitEvent::ProbeFailed { pattern_name, .. } => pattern_name,
        }
    }
}
