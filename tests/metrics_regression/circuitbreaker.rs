//! Circuit breaker metrics regression tests

use super::helpers::*;
use intake_resilience_circuitbreaker::CircuitBreakerLayer;
use intake_resilience_core::BoxError;
use serial_test::serial;
use std::time::Duration;
use tower::{Layer, ServiceExt};

#[tokio::test]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreakerLayer::builder()
        .name("metrics_cb")
        .volume_threshold(2)
        .error_threshold_percentage(40.0)
        .reset_timeout(Duration::from_millis(20))
        .build()
        .layer(tower::service_fn(|n: u64| async move {
            if n % 2 == 1 { Err("failure") } else { Ok(n) }
        }));

    // success, failure: 50% of 2 calls opens the circuit
    let _ = breaker.clone().oneshot(0).await;
    let _ = breaker.clone().oneshot(1).await;
    // rejected while open
    let _ = breaker.clone().oneshot(2).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    // half-open trial succeeds
    let _ = breaker.clone().oneshot(4).await;

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "open");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "half_open");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "metrics_cb");
}

#[tokio::test]
#[serial]
async fn circuitbreaker_fallback_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreakerLayer::builder()
        .name("metrics_cb_fallback")
        .build()
        .layer(tower::service_fn(|_: u64| async { Err::<u64, _>("failure") }));

    let with_value = breaker
        .clone()
        .with_fallback(|_: u64| Box::pin(async { Ok::<_, BoxError>(0) }));
    let _ = with_value.oneshot(1).await;

    let without_value = breaker
        .with_fallback(|_: u64| Box::pin(async { Err::<u64, BoxError>("cache empty".into()) }));
    let _ = without_value.oneshot(2).await;

    assert_counter_exists("circuitbreaker_fallbacks_total");
    assert_metric_has_label("circuitbreaker_fallbacks_total", "circuitbreaker", "metrics_cb_fallback");
    assert_metric_has_label("circuitbreaker_fallbacks_total", "outcome", "value");
    assert_metric_has_label("circuitbreaker_fallbacks_total", "outcome", "null");
}
