//! Adaptive limit metrics regression tests

use super::helpers::*;
use futures::future::BoxFuture;
use intake_resilience_loadlimit::{
    AdaptiveLimitCache, AdaptiveLimitConfig, LoadProbe, LoadProbeError, LoadSample,
};
use serial_test::serial;

struct Busy;

impl LoadProbe for Busy {
    fn sample(&self) -> BoxFuture<'_, Result<LoadSample, LoadProbeError>> {
        Box::pin(async { Ok(LoadSample::new(97.0, 40.0)) })
    }
}

struct Broken;

impl LoadProbe for Broken {
    fn sample(&self) -> BoxFuture<'_, Result<LoadSample, LoadProbeError>> {
        Box::pin(async {
            Err(LoadProbeError::Unavailable {
                reason: "no procfs".into(),
            })
        })
    }
}

#[tokio::test]
#[serial]
async fn loadlimit_metrics_exist() {
    init_recorder();

    let busy = AdaptiveLimitCache::new(
        AdaptiveLimitConfig::builder().name("metrics_loadlimit").build(),
        Busy,
    );
    assert_eq!(busy.current_limit().await, 50);

    let broken = AdaptiveLimitCache::new(
        AdaptiveLimitConfig::builder().name("metrics_loadlimit_broken").build(),
        Broken,
    );
    assert_eq!(broken.current_limit().await, 100);

    assert_counter_exists("loadlimit_probes_total");
    assert_metric_has_label("loadlimit_probes_total", "loadlimit", "metrics_loadlimit");
    assert_metric_has_label("loadlimit_probes_total", "outcome", "ok");
    assert_metric_has_label("loadlimit_probes_total", "outcome", "failed");

    assert_gauge_exists("loadlimit_current_limit");
    assert_metric_has_label("loadlimit_current_limit", "loadlimit", "metrics_loadlimit");
}
