//! Concurrency gate metrics regression tests

use super::helpers::*;
use intake_resilience_gate::GateConfig;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn gate_metrics_exist() {
    init_recorder();

    let gate = GateConfig::builder()
        .name("metrics_gate")
        .capacity(1)
        .max_wait(Some(Duration::from_millis(5)))
        .build();

    let held = gate.acquire().await.unwrap();
    assert!(gate.acquire().await.is_err());
    drop(held);
    gate.run(async {}).await.unwrap();

    assert_counter_exists("gate_acquisitions_total");
    assert_metric_has_label("gate_acquisitions_total", "gate", "metrics_gate");
    assert_counter_exists("gate_wait_timeouts_total");
    assert_metric_has_label("gate_wait_timeouts_total", "gate", "metrics_gate");
    assert_gauge_exists("gate_slots_held");
    assert_histogram_exists("gate_wait_seconds");
}
