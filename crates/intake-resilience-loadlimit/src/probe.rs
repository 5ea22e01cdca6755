use futures::future::BoxFuture;
use intake_resilience_core::ResilienceError;
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::System;
use tokio::time::Instant;

/// A point-in-time reading of host utilization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    /// Global CPU utilization, 0.0 to 100.0.
    pub cpu_percent: f64,
    /// Used memory over total memory, 0.0 to 100.0.
    pub memory_percent: f64,
    /// When the sample was taken.
    pub timestamp: Instant,
}

impl LoadSample {
    /// Builds a sample from already computed percentages.
    pub fn new(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            cpu_percent,
            memory_percent,
            timestamp: Instant::now(),
        }
    }

    /// Builds a sample from raw memory counters.
    pub fn from_memory(cpu_percent: f64, used: u64, total: u64) -> Result<Self, LoadProbeError> {
        if total == 0 {
            return Err(LoadProbeError::Unavailable {
                reason: "total memory reported as zero".to_string(),
            });
        }
        if !cpu_percent.is_finite() {
            return Err(LoadProbeError::Unavailable {
                reason: format!("cpu utilization is not a number: {cpu_percent}"),
            });
        }
        Ok(Self::new(cpu_percent, used as f64 / total as f64 * 100.0))
    }
}

/// Failure to sample host load.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadProbeError {
    /// The metrics source could not produce a reading.
    #[error("load metrics unavailable: {reason}")]
    Unavailable {
        /// What went wrong.
        reason: String,
    },
    /// The sampling task was cancelled or panicked.
    #[error("load sampling task did not complete: {reason}")]
    Interrupted {
        /// Join error rendered as text.
        reason: String,
    },
}

impl<E> From<LoadProbeError> for ResilienceError<E> {
    fn from(err: LoadProbeError) -> Self {
        ResilienceError::MetricsUnavailable {
            reason: err.to_string(),
        }
    }
}

/// Source of host load samples.
pub trait LoadProbe: Send + Sync + 'static {
    /// Takes one sample.
    fn sample(&self) -> BoxFuture<'_, Result<LoadSample, LoadProbeError>>;
}

impl<P: LoadProbe + ?Sized> LoadProbe for Arc<P> {
    fn sample(&self) -> BoxFuture<'_, Result<LoadSample, LoadProbeError>> {
        (**self).sample()
    }
}

/// Probe backed by the operating system via `sysinfo`.
///
/// CPU utilization is measured between consecutive refreshes, so the probe
/// keeps one `System` alive for its whole lifetime and primes it on creation.
#[derive(Clone)]
pub struct SystemLoadProbe {
    system: Arc<Mutex<System>>,
}

impl SystemLoadProbe {
    /// Creates a probe and takes the priming refresh.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SystemLoadProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadProbe for SystemLoadProbe {
    fn sample(&self) -> BoxFuture<'_, Result<LoadSample, LoadProbeError>> {
        let system = Arc::clone(&self.system);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut system = system.lock();
                system.refresh_cpu();
                system.refresh_memory();
                let cpu = f64::from(system.global_cpu_info().cpu_usage());
                LoadSample::from_memory(cpu, system.used_memory(), system.total_memory())
            })
            .await
            .map_err(|e| LoadProbeError::Interrupted {
                reason: e.to_string(),
            })?
        })
    }
}
