use intake_resilience_retry::{RetryConfig, RetryError, retry_with_backoff};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn delays_grow_geometrically_up_to_the_cap() {
    let attempts_at = Arc::new(Mutex::new(Vec::new()));
    let config = RetryConfig::builder()
        .max_retries(5)
        .initial_delay(Duration::from_millis(100))
        .backoff_factor(2.0)
        .max_delay(Duration::from_millis(500))
        .build_config();

    let start = Instant::now();
    let log = Arc::clone(&attempts_at);
    let result: Result<(), _> = retry_with_backoff(
        || {
            log.lock().unwrap().push(start.elapsed());
            async { Err("ETIMEDOUT") }
        },
        &config,
    )
    .await;

    assert!(matches!(
        result,
        Err(RetryError::Exhausted {
            attempts: 6,
            last: "ETIMEDOUT"
        })
    ));

    let gaps: Vec<Duration> = attempts_at
        .lock()
        .unwrap()
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect();
    assert_eq!(
        gaps,
        [100, 200, 400, 500, 500].map(Duration::from_millis).to_vec()
    );
}

#[tokio::test(start_paused = true)]
async fn first_attempt_is_immediate() {
    let config = RetryConfig::builder()
        .initial_delay(Duration::from_secs(30))
        .build_config();

    let start = Instant::now();
    let value = retry_with_backoff(|| async { Ok::<_, &str>(42) }, &config)
        .await
        .unwrap();
    assert_eq!(value, 42);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn recovers_before_exhaustion() {
    let config = RetryConfig::builder().max_retries(3).build_config();
    let attempts = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&attempts);

    let value = retry_with_backoff(
        || {
            let attempt = {
                let mut n = counter.lock().unwrap();
                *n += 1;
                *n
            };
            async move { if attempt < 3 { Err("503 busy") } else { Ok(attempt) } }
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(value, 3);
}
