use crate::config::AdaptiveLimitConfig;
use crate::events::LoadLimitEvent;
use crate::probe::LoadProbe;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// A computed limit and when it was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedLimit {
    /// The budget, always at least 1.
    pub limit: usize,
    /// When the sample behind it was taken.
    pub computed_at: Instant,
}

impl CachedLimit {
    fn is_fresh(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.saturating_duration_since(self.computed_at) < ttl
    }
}

/// Anything that can tell the admission layer the current budget.
pub trait LimitSource: Send + Sync + 'static {
    /// The budget to apply to the next arrival.
    fn current_limit(&self) -> BoxFuture<'_, usize>;
}

/// A constant budget, for tests and for deployments without load sensing.
#[derive(Debug, Clone, Copy)]
pub struct FixedLimit(pub usize);

impl LimitSource for FixedLimit {
    fn current_limit(&self) -> BoxFuture<'_, usize> {
        let limit = self.0.max(1);
        Box::pin(async move { limit })
    }
}

struct Shared {
    config: AdaptiveLimitConfig,
    probe: Box<dyn LoadProbe>,
    cached: RwLock<Option<CachedLimit>>,
    recomputing: AtomicBool,
}

/// Turns host load samples into an admission budget.
///
/// The budget is cached for `cache_duration`. When it goes stale exactly one
/// caller recomputes it; everyone arriving meanwhile is served the previous
/// value (or the base limit before the first computation) without waiting.
/// Clones share the same cache.
#[derive(Clone)]
pub struct AdaptiveLimitCache {
    shared: Arc<Shared>,
}

/// Clears the in-progress marker however the recomputation ends.
struct RecomputeClaim<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RecomputeClaim<'a> {
    fn try_claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RecomputeClaim<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl AdaptiveLimitCache {
    /// Creates a cache sampling through `probe`.
    pub fn new<P>(config: AdaptiveLimitConfig, probe: P) -> Self
    where
        P: LoadProbe,
    {
        Self {
            shared: Arc::new(Shared {
                config,
                probe: Box::new(probe),
                cached: RwLock::new(None),
                recomputing: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AdaptiveLimitConfig {
        &self.shared.config
    }

    /// Returns the cached entry, fresh or not.
    pub fn cached(&self) -> Option<CachedLimit> {
        *self.shared.cached.read()
    }

    /// Returns true while a recomputation is running.
    pub fn is_recomputing(&self) -> bool {
        self.shared.recomputing.load(Ordering::Acquire)
    }

    /// Drops the cached entry so the next call samples again.
    pub fn invalidate(&self) {
        *self.shared.cached.write() = None;
    }

    fn fresh(&self) -> Option<CachedLimit> {
        let ttl = self.shared.config.cache_duration;
        self.cached()
            .filter(|cached| cached.is_fresh(Instant::now(), ttl))
    }

    /// The budget to apply right now.
    ///
    /// Never fails: a probe error is logged and answered with the base limit,
    /// which is not cached.
    pub async fn current_limit(&self) -> usize {
        let config = &self.shared.config;

        if let Some(cached) = self.fresh() {
            config.event_listeners.emit(&LoadLimitEvent::CacheHit {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                limit: cached.limit,
            });
            return cached.limit;
        }

        let Some(_claim) = RecomputeClaim::try_claim(&self.shared.recomputing) else {
            let served_limit = self
                .cached()
                .map(|cached| cached.limit)
                .unwrap_or(config.base_limit);
            tracing::trace!(
                loadlimit = %config.name,
                served_limit,
                "limit recomputation already in flight"
            );
            config
                .event_listeners
                .emit(&LoadLimitEvent::RecomputeInFlight {
                    pattern_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    served_limit,
                });
            return served_limit;
        };

        // Another caller may have refreshed the entry between our freshness
        // check and the claim.
        if let Some(cached) = self.fresh() {
            return cached.limit;
        }

        match self.shared.probe.sample().await {
            Ok(sample) => {
                let limit = config.limit_for(&sample);
                let high_load = config.is_high_load(&sample);
                *self.shared.cached.write() = Some(CachedLimit {
                    limit,
                    computed_at: Instant::now(),
                });

                if high_load {
                    tracing::warn!(
                        loadlimit = %config.name,
                        cpu = sample.cpu_percent,
                        memory = sample.memory_percent,
                        limit,
                        "host under load, admission budget reduced"
                    );
                } else {
                    tracing::debug!(
                        loadlimit = %config.name,
                        cpu = sample.cpu_percent,
                        memory = sample.memory_percent,
                        limit,
                        "admission budget recomputed"
                    );
                }

                config.event_listeners.emit(&LoadLimitEvent::LimitComputed {
                    pattern_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    limit,
                    cpu_percent: sample.cpu_percent,
                    memory_percent: sample.memory_percent,
                    high_load,
                });

                #[cfg(feature = "metrics")]
                {
                    counter!("loadlimit_probes_total", "loadlimit" => config.name.clone(), "outcome" => "ok").increment(1);
                    gauge!("loadlimit_current_limit", "loadlimit" => config.name.clone())
                        .set(limit as f64);
                }

                limit
            }
            Err(err) => {
                tracing::error!(
                    loadlimit = %config.name,
                    error = %err,
                    base_limit = config.base_limit,
                    "failed to sample host load, serving base limit"
                );
                config.event_listeners.emit(&LoadLimitEvent::ProbeFailed {
                    pattern_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    reason: err.to_string(),
                });

                #[cfg(feature = "metrics")]
                counter!("loadlimit_probes_total", "loadlimit" => config.name.clone(), "outcome" => "failed").increment(1);

                config.base_limit
            }
        }
    }
}

impl LimitSource for AdaptiveLimitCache {
    fn current_limit(&self) -> BoxFuture<'_, usize> {
        Box::pin(AdaptiveLimitCache::current_limit(self))
    }
}
