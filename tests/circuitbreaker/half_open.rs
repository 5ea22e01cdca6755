use super::Switchable;
use intake_resilience_circuitbreaker::{CircuitBreakerError, CircuitBreakerLayer, CircuitState};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::{Layer, service_fn};

const RESET: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn only_one_trial_runs_at_a_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let breaker = CircuitBreakerLayer::builder()
        .reset_timeout(RESET)
        .build()
        .layer(service_fn(move |_: ()| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, &'static str>("scanned")
            }
        }));

    breaker.force_open();
    tokio::time::advance(RESET).await;

    let trial = tokio::spawn(breaker.fire(()));
    while calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.metrics().trial_in_flight);

    for _ in 0..3 {
        let err = breaker.fire(()).await.unwrap_err();
        assert!(err.is_circuit_open());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(trial.await.unwrap().unwrap(), "scanned");
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().total_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_trial_restarts_the_reset_timer() {
    let upstream = Switchable::new(true);
    let breaker = CircuitBreakerLayer::builder()
        .reset_timeout(RESET)
        .build()
        .layer(upstream.service());

    let _ = breaker.fire(1).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(RESET).await;
    let err = breaker.fire(1).await.unwrap_err();
    assert!(matches!(err, CircuitBreakerError::Inner(_)));
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(upstream.calls(), 2);

    tokio::time::advance(RESET - Duration::from_secs(1)).await;
    assert!(breaker.fire(1).await.unwrap_err().is_circuit_open());
    assert_eq!(upstream.calls(), 2);

    upstream.set_failing(false);
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(breaker.fire(7).await.unwrap(), 7);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn cancelled_trial_lets_the_next_arrival_trial() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let breaker = CircuitBreakerLayer::builder()
        .reset_timeout(RESET)
        .build()
        .layer(service_fn(move |_: ()| {
            let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
            async move {
                if first {
                    futures::future::pending::<()>().await;
                }
                Ok::<_, &'static str>(())
            }
        }));

    breaker.force_open();
    tokio::time::advance(RESET).await;

    let stuck = tokio::spawn(breaker.fire(()));
    while calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    stuck.abort();
    assert!(stuck.await.unwrap_err().is_cancelled());

    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(!breaker.metrics().trial_in_flight);
    breaker.fire(()).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}
