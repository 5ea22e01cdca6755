//! Test organization:
//! - adaptive.rs: budgets that follow host load
//! - identity.rs: principal and origin accounting
//! - layer.rs: the tower layer in a service stack
//! - window.rs: fixed window boundaries and retry-after hints

mod adaptive;
mod layer;
mod window;

use futures::future::BoxFuture;
use intake_resilience_loadlimit::{LoadProbe, LoadProbeError, LoadSample};
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

/// Host load set by the test.
#[derive(Clone)]
pub struct HostLoad {
    cpu_percent: Arc<Mutex<f64>>,
}

impl HostLoad {
    pub fn at(cpu_percent: f64) -> Self {
        Self {
            cpu_percent: Arc::new(Mutex::new(cpu_percent)),
        }
    }

    pub fn set(&self, cpu_percent: f64) {
        *self.cpu_percent.lock() = cpu_percent;
    }
}

impl LoadProbe for HostLoad {
    fn sample(&self) -> BoxFuture<'_, Result<LoadSample, LoadProbeError>> {
        let cpu = *self.cpu_percent.lock();
        Box::pin(async move { Ok(LoadSample::new(cpu, 20.0)) })
    }
}

pub fn peer(last_octet: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(203, 0, 113, last_octet))
}
