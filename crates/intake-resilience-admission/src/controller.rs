//! The admission controller.

use crate::config::AdmissionConfig;
use crate::error::Throttled;
use crate::events::AdmissionEvent;
use crate::identity::Identity;
use crate::window::WindowState;
use intake_resilience_loadlimit::LimitSource;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a successful admission, for `RateLimit-*` style headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Budget applied to this arrival.
    pub limit: usize,
    /// Arrivals the identity may still make in this window.
    pub remaining: usize,
    /// Time until the window rolls over.
    pub reset_after: Duration,
}

/// Snapshot of one identity's usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Arrivals charged in the active window.
    pub count: usize,
    /// Time until the window rolls over.
    pub reset_after: Duration,
}

/// Per-identity fixed-window admission.
///
/// The budget is read from a [`LimitSource`] on every arrival, so it follows
/// host load when backed by an
/// [`AdaptiveLimitCache`](intake_resilience_loadlimit::AdaptiveLimitCache).
/// Checking and charging the counter happen under a single lock: concurrent
/// arrivals for one identity never admit more than the budget.
#[derive(Clone)]
pub struct AdmissionController {
    limits: Arc<dyn LimitSource>,
    state: Arc<Mutex<WindowState>>,
    config: Arc<AdmissionConfig>,
}

impl AdmissionController {
    /// Creates a controller from a budget source and a configuration.
    pub fn new<L>(limits: L, config: AdmissionConfig) -> Self
    where
        L: LimitSource,
    {
        Self::from_shared(Arc::new(limits), config)
    }

    /// Creates a controller around a budget source that is shared elsewhere.
    pub fn from_shared(limits: Arc<dyn LimitSource>, config: AdmissionConfig) -> Self {
        Self {
            limits,
            state: Arc::new(Mutex::new(WindowState::new(config.window))),
            config: Arc::new(config),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> crate::AdmissionConfigBuilder {
        crate::AdmissionConfigBuilder::new()
    }

    /// Charges one arrival to `identity`, or rejects it if the identity has
    /// spent the current budget.
    pub async fn admit(&self, identity: &Identity) -> Result<Admission, Throttled> {
        // Fetch before locking: the source may have to sample the host.
        let limit = self.limits.current_limit().await.max(1);
        let now = Instant::now();

        let (charged, reset_after, rolled, _tracked) = {
            let mut state = self.state.lock();
            let before = state.tracked();
            let rolled = state.roll(now).then_some(before);
            let charged = state.try_charge(identity, limit);
            (charged, state.reset_after(now), rolled, state.tracked())
        };

        if let Some(identities) = rolled {
            self.on_rollover(identities);
        }

        #[cfg(feature = "metrics")]
        gauge!("admission_tracked_identities", "admission" => self.config.name.clone())
            .set(_tracked as f64);

        match charged {
            Some(count) => {
                let remaining = limit - count;
                tracing::trace!(
                    admission = %self.config.name,
                    %identity,
                    limit,
                    remaining,
                    "admitted"
                );
                self.config.event_listeners.emit(&AdmissionEvent::Admitted {
                    pattern_name: self.config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    identity: identity.clone(),
                    limit,
                    remaining,
                });

                #[cfg(feature = "metrics")]
                counter!(
                    "admission_requests_total",
                    "admission" => self.config.name.clone(),
                    "identity_kind" => identity.kind(),
                    "result" => "admitted"
                )
                .increment(1);

                Ok(Admission {
                    limit,
                    remaining,
                    reset_after,
                })
            }
            None => {
                tracing::warn!(
                    admission = %self.config.name,
                    %identity,
                    kind = identity.kind(),
                    limit,
                    retry_after_ms = reset_after.as_millis() as u64,
                    "throttled"
                );
                self.config.event_listeners.emit(&AdmissionEvent::Throttled {
                    pattern_name: self.config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    identity: identity.clone(),
                    limit,
                    retry_after: reset_after,
                });

                #[cfg(feature = "metrics")]
                counter!(
                    "admission_requests_total",
                    "admission" => self.config.name.clone(),
                    "identity_kind" => identity.kind(),
                    "result" => "throttled"
                )
                .increment(1);

                Err(Throttled {
                    identity: identity.clone(),
                    limit,
                    window: self.config.window,
                    retry_after: reset_after,
                })
            }
        }
    }

    fn on_rollover(&self, identities: usize) {
        tracing::debug!(admission = %self.config.name, identities, "admission window rolled over");
        self.config
            .event_listeners
            .emit(&AdmissionEvent::WindowRolled {
                pattern_name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                identities,
            });
    }

    /// Current usage for `identity`, without charging it.
    pub fn usage(&self, identity: &Identity) -> Usage {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.roll(now);
        Usage {
            count: state.count(identity),
            reset_after: state.reset_after(now),
        }
    }

    /// Number of identities charged in the active window.
    pub fn tracked_identities(&self) -> usize {
        let mut state = self.state.lock();
        state.roll(Instant::now());
        state.tracked()
    }

    /// Drops every count and starts a fresh window now.
    pub fn reset(&self) {
        self.state.lock().clear(Instant::now());
        tracing::info!(admission = %self.config.name, "admission counters reset");
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.state.lock().length()
    }

    /// Controller configuration.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("name", &self.config.name)
            .field("window", &self.config.window)
            .finish()
    }
}
