use super::Switchable;
use intake_resilience_circuitbreaker::{CircuitBreakerError, CircuitBreakerLayer, CircuitState};
use std::time::Duration;
use tower::Layer;

#[tokio::test]
async fn opens_only_once_failures_exceed_the_threshold() {
    let upstream = Switchable::new(false);
    let breaker = CircuitBreakerLayer::builder()
        .error_threshold_percentage(50.0)
        .volume_threshold(4)
        .name("thresholds")
        .build()
        .layer(upstream.service());

    // Two failures out of four is exactly 50%, which does not exceed it.
    for failing in [false, true, false, true] {
        upstream.set_failing(failing);
        let _ = breaker.fire(1).await;
    }
    assert_eq!(breaker.state(), CircuitState::Closed);

    upstream.set_failing(true);
    let _ = breaker.fire(1).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    let before = upstream.calls();
    let err = breaker.fire(1).await.unwrap_err();
    assert!(matches!(err, CircuitBreakerError::OpenCircuit));
    assert_eq!(upstream.calls(), before, "open circuit must not invoke the operation");
}

#[tokio::test]
async fn volume_threshold_keeps_a_sparse_window_closed() {
    let upstream = Switchable::new(true);
    let breaker = CircuitBreakerLayer::builder()
        .volume_threshold(5)
        .build()
        .layer(upstream.service());

    for _ in 0..4 {
        let err = breaker.fire(1).await.unwrap_err();
        assert!(matches!(err, CircuitBreakerError::Inner("upstream failed")));
    }
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().failure_count, 4);

    let _ = breaker.fire(1).await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn zero_volume_threshold_opens_on_first_failure() {
    let upstream = Switchable::new(true);
    let breaker = CircuitBreakerLayer::builder().build().layer(upstream.service());

    let _ = breaker.fire(1).await;
    assert!(breaker.is_open());
}

#[tokio::test(start_paused = true)]
async fn old_outcomes_leave_the_rolling_window() {
    let upstream = Switchable::new(true);
    let breaker = CircuitBreakerLayer::builder()
        .rolling_count_timeout(Duration::from_secs(1))
        .volume_threshold(3)
        .build()
        .layer(upstream.service());

    let _ = breaker.fire(1).await;
    let _ = breaker.fire(1).await;
    assert_eq!(breaker.metrics().total_calls, 2);

    tokio::time::advance(Duration::from_millis(1_500)).await;
    assert_eq!(breaker.metrics().total_calls, 0);

    // Only the newest three outcomes count: one failure in three.
    upstream.set_failing(false);
    let _ = breaker.fire(1).await;
    let _ = breaker.fire(1).await;
    upstream.set_failing(true);
    let _ = breaker.fire(1).await;

    let metrics = breaker.metrics();
    assert_eq!(metrics.total_calls, 3);
    assert_eq!(metrics.failure_count, 1);
    assert_eq!(metrics.state, CircuitState::Closed);
}
