//! Retry metrics regression tests

use super::helpers::*;
use intake_resilience_retry::{RetryConfig, retry_with_backoff};
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn retry_metrics_exist() {
    init_recorder();

    let config = RetryConfig::builder()
        .name("metrics_retry")
        .max_retries(1)
        .initial_delay(Duration::from_millis(1))
        .retryable_pattern("ECONNRESET")
        .build_config();

    let _ = retry_with_backoff(|| async { Ok::<_, &str>(()) }, &config).await;
    let _ = retry_with_backoff(|| async { Err::<(), _>("read ECONNRESET") }, &config).await;
    let _ = retry_with_backoff(|| async { Err::<(), _>("permission denied") }, &config).await;

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "metrics_retry");
    assert_metric_has_label("retry_calls_total", "outcome", "success");
    assert_metric_has_label("retry_calls_total", "outcome", "exhausted");
    assert_metric_has_label("retry_calls_total", "outcome", "non_retryable");

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "retry", "metrics_retry");
}
