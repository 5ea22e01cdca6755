use intake_resilience_gate::{ConcurrencyGate, GateConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn failed_work_releases_its_slot() {
    let gate = ConcurrencyGate::with_capacity(1);
    let result: Result<(), &str> = gate.run(async { Err("virus scan failed") }).await.unwrap();
    assert!(result.is_err());
    assert_eq!(gate.available(), 1);
}

#[tokio::test]
async fn timed_out_work_releases_its_slot() {
    let gate = ConcurrencyGate::with_capacity(1);
    let outcome = tokio::time::timeout(
        Duration::from_millis(10),
        gate.run(futures::future::pending::<()>()),
    )
    .await;
    assert!(outcome.is_err());
    assert_eq!(gate.held(), 0);
    assert!(gate.try_acquire().is_some());
}

#[tokio::test]
async fn every_acquisition_is_paired_with_a_release() {
    let acquired = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let (a, r) = (Arc::clone(&acquired), Arc::clone(&released));

    let gate = GateConfig::builder()
        .capacity(2)
        .name("thumbnails")
        .on_slot_acquired(move |_, _| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .on_slot_released(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let mut tasks = Vec::new();
    for n in 0..10u64 {
        let gate = gate.clone();
        tasks.push(tokio::spawn(async move {
            gate.run(async move {
                tokio::time::sleep(Duration::from_millis(n % 3)).await;
                if n % 4 == 0 {
                    panic!("worker {n} crashed");
                }
            })
            .await
        }));
    }
    let panicked = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| joined.is_err())
        .count();

    assert_eq!(panicked, 3);
    assert_eq!(acquired.load(Ordering::SeqCst), 10);
    assert_eq!(released.load(Ordering::SeqCst), 10);
    assert_eq!(gate.held(), 0);
    assert!(gate.peak() <= 2);
}

#[tokio::test]
async fn reset_peak_starts_from_current_occupancy() {
    let gate = ConcurrencyGate::with_capacity(4);
    let slots: Vec<_> = (0..3).map(|_| gate.try_acquire().unwrap()).collect();
    assert_eq!(gate.peak(), 3);

    drop(slots);
    let _one = gate.try_acquire().unwrap();
    gate.reset_peak();
    assert_eq!(gate.peak(), 1);
}
