//! The gate and its slot guard.

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::events::GateEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

struct Shared {
    semaphore: Arc<Semaphore>,
    config: GateConfig,
    held: AtomicUsize,
    peak: AtomicUsize,
}

/// Bounds how many operations run at once.
///
/// Waiters are served in arrival order. Clones share the same slots.
#[derive(Clone)]
pub struct ConcurrencyGate {
    shared: Arc<Shared>,
}

/// One occupied slot. Returned to the gate when dropped.
#[must_use = "the slot is released as soon as it is dropped"]
pub struct ConcurrencySlot {
    _permit: OwnedSemaphorePermit,
    shared: Arc<Shared>,
    acquired_at: Instant,
}

impl ConcurrencyGate {
    /// Creates a gate from a configuration.
    pub fn new(config: GateConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                semaphore: Arc::new(Semaphore::new(config.capacity)),
                config,
                held: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates an unnamed gate with `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        GateConfig::builder().capacity(capacity).build()
    }

    /// Waits for a free slot.
    ///
    /// Fails only if the gate is closed or the configured maximum wait
    /// elapses.
    pub async fn acquire(&self) -> Result<ConcurrencySlot> {
        let config = &self.shared.config;
        let started = Instant::now();
        let semaphore = Arc::clone(&self.shared.semaphore);

        let acquired = match config.max_wait {
            Some(limit) => match tokio::time::timeout(limit, semaphore.acquire_owned()).await {
                Ok(acquired) => acquired,
                Err(_) => {
                    tracing::warn!(gate = %config.name, waited_ms = limit.as_millis() as u64, "gave up waiting for a slot");
                    config.event_listeners.emit(&GateEvent::WaitTimedOut {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        waited: limit,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("gate_wait_timeouts_total", "gate" => config.name.clone()).increment(1);

                    return Err(GateError::Timeout {
                        name: config.name.clone(),
                        capacity: config.capacity,
                    });
                }
            },
            None => semaphore.acquire_owned().await,
        };

        let permit = acquired.map_err(|_| GateError::Closed {
            name: config.name.clone(),
        })?;
        Ok(self.occupy(permit, started.elapsed()))
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<ConcurrencySlot> {
        Arc::clone(&self.shared.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| self.occupy(permit, Duration::ZERO))
    }

    /// Runs `future` while holding a slot.
    ///
    /// The slot is released when the future completes, panics, or is dropped.
    pub async fn run<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        let _slot = self.acquire().await?;
        Ok(future.await)
    }

    fn occupy(&self, permit: OwnedSemaphorePermit, waited: Duration) -> ConcurrencySlot {
        let config = &self.shared.config;
        let held = self.shared.held.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.peak.fetch_max(held, Ordering::AcqRel);

        tracing::trace!(gate = %config.name, held, capacity = config.capacity, "slot acquired");
        config.event_listeners.emit(&GateEvent::SlotAcquired {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            held,
            waited,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("gate_acquisitions_total", "gate" => config.name.clone()).increment(1);
            histogram!("gate_wait_seconds", "gate" => config.name.clone()).record(waited.as_secs_f64());
            gauge!("gate_slots_held", "gate" => config.name.clone()).set(held as f64);
        }

        ConcurrencySlot {
            _permit: permit,
            shared: Arc::clone(&self.shared),
            acquired_at: Instant::now(),
        }
    }

    /// Slots currently held.
    pub fn held(&self) -> usize {
        self.shared.held.load(Ordering::Acquire)
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.shared.semaphore.available_permits()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    /// Highest number of slots held at once since creation or the last
    /// [`reset_peak`](Self::reset_peak).
    pub fn peak(&self) -> usize {
        self.shared.peak.load(Ordering::Acquire)
    }

    /// Restarts peak tracking from the current occupancy.
    pub fn reset_peak(&self) {
        self.shared.peak.store(self.held(), Ordering::Release);
    }

    /// Stops handing out slots. Pending and future `acquire` calls fail with
    /// [`GateError::Closed`]; slots already held stay valid until dropped.
    pub fn close(&self) {
        tracing::info!(gate = %self.shared.config.name, "gate closed");
        self.shared.semaphore.close();
    }

    /// Returns true after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.shared.semaphore.is_closed()
    }

    /// Gate name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("name", &self.shared.config.name)
            .field("capacity", &self.shared.config.capacity)
            .field("held", &self.held())
            .finish()
    }
}

impl std::fmt::Debug for ConcurrencySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencySlot")
            .field("gate", &self.shared.config.name)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

impl ConcurrencySlot {
    /// How long this slot has been held.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        let config = &self.shared.config;
        let held = self.shared.held.fetch_sub(1, Ordering::AcqRel) - 1;
        let held_for = self.acquired_at.elapsed();

        tracing::trace!(gate = %config.name, held, "slot released");
        config.event_listeners.emit(&GateEvent::SlotReleased {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            held_for,
        });

        #[cfg(feature = "metrics")]
        gauge!("gate_slots_held", "gate" => config.name.clone()).set(held as f64);
    }
}
