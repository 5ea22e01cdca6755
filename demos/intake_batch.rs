//! Intake pipeline over a batch of uploads.
//!
//! Run with: cargo run --example intake_batch [config.toml]
//! With logs: RUST_LOG=debug cargo run --example intake_batch

use intake_resilience::admission::Identity;
use intake_resilience::loadlimit::{AdaptiveLimitCache, SystemLoadProbe};
use intake_resilience::{
    BatchRunner, FallbackSpec, IntakeConfig, ItemOutcome, ResilientOperationBuilder, observability,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::service_fn;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => IntakeConfig::from_path(path)?,
        None => IntakeConfig::default(),
    };
    println!("Effective configuration:\n{}", config.to_toml_string()?);

    // Admission budget follows host CPU and memory.
    let limits = AdaptiveLimitCache::new(
        observability::log_load_limits(config.load_limit().name("uploads")).build(),
        SystemLoadProbe::new(),
    );
    let admission = observability::log_throttling(config.admission().name("uploads")).build(limits);

    // The virus scanner drops every fourth connection.
    let scans = Arc::new(AtomicUsize::new(0));
    let scanner = service_fn(move |file: String| {
        let n = scans.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n % 4 == 3 {
                Err(format!("scanning {file}: ECONNRESET"))
            } else {
                Ok(format!("{file}: clean"))
            }
        }
    });

    let scan = ResilientOperationBuilder::<String, String>::new()
        .retry(observability::log_retries(config.retry()?.name("scan")).build())
        .breaker(
            observability::log_breaker_transitions(config.circuit_breaker().name("scan"))
                .volume_threshold(5)
                .build(),
        )
        .fallback(FallbackSpec::Static("queued for rescan".to_string()))
        .build(scanner);

    let gate = config.gate().name("scan").build();
    let runner = BatchRunner::new(gate.clone());

    let peer = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));
    let identity = Identity::resolve(Some("demo-user"), peer);
    let mut accepted = Vec::new();
    for n in 0..12 {
        let file = format!("upload-{n:02}.pdf");
        match admission.admit(&identity).await {
            Ok(admitted) => {
                println!("{file}: admitted, {} left in window", admitted.remaining);
                accepted.push(file);
            }
            Err(throttled) => println!("{file}: {throttled}"),
        }
    }

    let report = runner.run(&scan, accepted).await;
    for item in &report.items {
        match item {
            ItemOutcome::Succeeded(verdict) => println!("  {verdict}"),
            ItemOutcome::Fallback { value, cause } => println!("  {value} ({})", cause.as_str()),
            ItemOutcome::Degraded { cause } => println!("  no result ({})", cause.as_str()),
            ItemOutcome::Failed(err) => println!("  failed: {err}"),
        }
    }
    println!(
        "{} scanned, {} via fallback, {} degraded, {} failed; breaker {:?}, peak concurrency {}",
        report.succeeded,
        report.fallback,
        report.degraded,
        report.failed,
        scan.state(),
        gate.peak()
    );
    Ok(())
}
