use super::{HostLoad, peer};
use intake_resilience_admission::{AdmissionController, Identity};
use intake_resilience_loadlimit::{AdaptiveLimitCache, AdaptiveLimitConfig};
use std::time::Duration;

fn controller(load: &HostLoad) -> AdmissionController {
    let limits = AdaptiveLimitCache::new(
        AdaptiveLimitConfig::builder()
            .base_limit(4)
            .cpu_threshold_percent(80.0)
            .high_load_factor(0.5)
            .cache_duration(Duration::from_secs(5))
            .build(),
        load.clone(),
    );
    AdmissionController::builder()
        .window(Duration::from_secs(60))
        .build(limits)
}

#[tokio::test(start_paused = true)]
async fn loaded_host_halves_the_budget() {
    let load = HostLoad::at(95.0);
    let admission = controller(&load);
    let caller = Identity::from(peer(1));

    assert_eq!(admission.admit(&caller).await.unwrap().limit, 2);
    admission.admit(&caller).await.unwrap();
    let throttled = admission.admit(&caller).await.unwrap_err();
    assert_eq!(throttled.limit, 2);
}

#[tokio::test(start_paused = true)]
async fn recovered_host_restores_the_budget_mid_window() {
    let load = HostLoad::at(95.0);
    let admission = controller(&load);
    let caller = Identity::Principal("u-7".into());

    admission.admit(&caller).await.unwrap();
    admission.admit(&caller).await.unwrap();
    assert!(admission.admit(&caller).await.is_err());

    load.set(30.0);
    tokio::time::advance(Duration::from_secs(5)).await;

    let admitted = admission.admit(&caller).await.unwrap();
    assert_eq!(admitted.limit, 4);
    assert_eq!(admitted.remaining, 1);
    assert_eq!(admission.usage(&caller).count, 3);
}

#[tokio::test(start_paused = true)]
async fn rising_load_shrinks_an_identity_already_over_the_new_budget() {
    let load = HostLoad::at(10.0);
    let admission = controller(&load);
    let caller = Identity::from(peer(2));

    for _ in 0..3 {
        admission.admit(&caller).await.unwrap();
    }

    load.set(99.0);
    tokio::time::advance(Duration::from_secs(5)).await;

    let throttled = admission.admit(&caller).await.unwrap_err();
    assert_eq!(throttled.limit, 2);
    assert_eq!(admission.usage(&caller).count, 3);
}
