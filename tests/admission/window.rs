use super::peer;
use intake_resilience_admission::{AdmissionController, FixedLimit, Identity};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn budget_refills_at_the_boundary() {
    let admission = AdmissionController::builder()
        .window(Duration::from_secs(10))
        .build(FixedLimit(3));
    let caller = Identity::from(peer(1));

    for expected_remaining in [2, 1, 0] {
        let admitted = admission.admit(&caller).await.unwrap();
        assert_eq!(admitted.remaining, expected_remaining);
    }

    tokio::time::advance(Duration::from_millis(9_999)).await;
    let throttled = admission.admit(&caller).await.unwrap_err();
    assert_eq!(throttled.retry_after, Duration::from_millis(1));

    tokio::time::advance(Duration::from_millis(1)).await;
    let admitted = admission.admit(&caller).await.unwrap();
    assert_eq!(admitted.remaining, 2);
    assert_eq!(admitted.reset_after, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn boundaries_stay_aligned_after_idle_windows() {
    let admission = AdmissionController::builder()
        .window(Duration::from_secs(10))
        .build(FixedLimit(5));
    let caller = Identity::from(peer(2));

    tokio::time::advance(Duration::from_secs(37)).await;
    let admitted = admission.admit(&caller).await.unwrap();
    assert_eq!(admitted.reset_after, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn rollover_is_reported_once_per_window() {
    let rolled = Arc::new(AtomicUsize::new(0));
    let throttled = Arc::new(AtomicUsize::new(0));
    let (r, t) = (Arc::clone(&rolled), Arc::clone(&throttled));

    let admission = AdmissionController::builder()
        .name("uploads")
        .window(Duration::from_secs(10))
        .on_window_rolled(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .on_throttled(move |_, _| {
            t.fetch_add(1, Ordering::SeqCst);
        })
        .build(FixedLimit(1));

    let caller = Identity::from(peer(3));
    admission.admit(&caller).await.unwrap();
    assert!(admission.admit(&caller).await.is_err());

    tokio::time::advance(Duration::from_secs(10)).await;
    admission.admit(&caller).await.unwrap();
    assert!(admission.admit(&caller).await.is_err());

    assert_eq!(rolled.load(Ordering::SeqCst), 1);
    assert_eq!(throttled.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn usage_does_not_charge() {
    let admission = AdmissionController::builder()
        .window(Duration::from_secs(60))
        .build(FixedLimit(2));
    let caller = Identity::Principal("dave".into());

    admission.admit(&caller).await.unwrap();
    for _ in 0..5 {
        assert_eq!(admission.usage(&caller).count, 1);
    }
    admission.admit(&caller).await.unwrap();
    assert!(admission.admit(&caller).await.is_err());
}
