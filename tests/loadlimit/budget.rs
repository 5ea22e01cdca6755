use super::ScriptedProbe;
use intake_resilience_loadlimit::{AdaptiveLimitCache, AdaptiveLimitConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn cache(base: usize, factor: f64, probe: &ScriptedProbe) -> AdaptiveLimitCache {
    AdaptiveLimitCache::new(
        AdaptiveLimitConfig::builder()
            .base_limit(base)
            .cpu_threshold_percent(80.0)
            .memory_threshold_percent(85.0)
            .high_load_factor(factor)
            .cache_duration(Duration::from_secs(5))
            .build(),
        probe.clone(),
    )
}

#[tokio::test]
async fn healthy_host_gets_the_base_limit() {
    let probe = ScriptedProbe::reading(35.0, 40.0);
    assert_eq!(cache(100, 0.5, &probe).current_limit().await, 100);
}

#[tokio::test]
async fn either_resource_above_threshold_reduces_the_budget() {
    let cpu_bound = ScriptedProbe::reading(92.0, 10.0);
    assert_eq!(cache(100, 0.5, &cpu_bound).current_limit().await, 50);

    let memory_bound = ScriptedProbe::reading(10.0, 90.0);
    assert_eq!(cache(100, 0.5, &memory_bound).current_limit().await, 50);
}

#[tokio::test]
async fn thresholds_are_strict() {
    let at_threshold = ScriptedProbe::reading(80.0, 85.0);
    assert_eq!(cache(100, 0.5, &at_threshold).current_limit().await, 100);
}

#[tokio::test]
async fn reduced_budget_rounds_down_but_never_reaches_zero() {
    let probe = ScriptedProbe::reading(99.0, 99.0);
    assert_eq!(cache(7, 0.5, &probe).current_limit().await, 3);
    assert_eq!(cache(3, 0.1, &probe).current_limit().await, 1);
}

#[tokio::test(start_paused = true)]
async fn stale_entry_follows_the_host() {
    let probe = ScriptedProbe::reading(10.0, 10.0);
    let cache = cache(60, 0.25, &probe);
    assert_eq!(cache.current_limit().await, 60);

    probe.set_reading(95.0, 10.0);
    assert_eq!(cache.current_limit().await, 60, "still cached");

    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(cache.current_limit().await, 15);
    assert_eq!(probe.calls(), 2);
}

#[tokio::test]
async fn listeners_see_each_computation() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let probe = ScriptedProbe::reading(90.0, 10.0);
    let cache = AdaptiveLimitCache::new(
        AdaptiveLimitConfig::builder()
            .base_limit(20)
            .on_limit_computed(move |limit, high_load| log.lock().unwrap().push((limit, high_load)))
            .build(),
        probe,
    );

    cache.current_limit().await;
    cache.current_limit().await;
    assert_eq!(*seen.lock().unwrap(), vec![(10, true)]);
}
