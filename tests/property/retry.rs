//! Property tests for the retry policy.
//!
//! Invariants tested:
//! - An operation runs at most `max_retries + 1` times
//! - It succeeds exactly when it recovers within that budget
//! - Delays never shrink and never exceed the cap

use super::paused_runtime;
use intake_resilience_retry::{RetryConfig, RetryError, retry_with_backoff};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: attempts are bounded and recovery is detected
    #[test]
    fn attempts_are_bounded(
        max_retries in 0usize..6,
        failures_before_success in 0usize..10,
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let config = RetryConfig::builder()
                .max_retries(max_retries)
                .initial_delay(Duration::from_millis(10))
                .build_config();

            let result = retry_with_backoff(
                || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < failures_before_success { Err("ETIMEDOUT") } else { Ok(n) }
                    }
                },
                &config,
            )
            .await;

            let expected_calls = (failures_before_success + 1).min(max_retries + 1);
            prop_assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
            if failures_before_success <= max_retries {
                prop_assert_eq!(result.ok(), Some(failures_before_success));
            } else {
                let exhausted = matches!(
                    result,
                    Err(RetryError::Exhausted { attempts, .. }) if attempts == max_retries + 1
                );
                prop_assert!(exhausted);
            }
            Ok(())
        })?;
    }

    /// Property: the schedule is monotonic and capped
    #[test]
    fn delays_are_monotonic_and_capped(
        initial_ms in 1u64..500,
        factor in 1.0f64..4.0,
        cap_ms in 1u64..5_000,
        max_retries in 1usize..8,
    ) {
        let cap = Duration::from_millis(cap_ms);
        let rt = paused_runtime();
        rt.block_on(async {
            let delays = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&delays);
            let config = RetryConfig::builder()
                .max_retries(max_retries)
                .initial_delay(Duration::from_millis(initial_ms))
                .backoff_factor(factor)
                .max_delay(cap)
                .on_retry(move |_, delay| log.lock().unwrap().push(delay))
                .build_config();

            let _ = retry_with_backoff(|| async { Err::<(), _>("busy") }, &config).await;

            let delays = delays.lock().unwrap().clone();
            prop_assert_eq!(delays.len(), max_retries);
            prop_assert!(delays.iter().all(|delay| *delay <= cap));
            prop_assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
            Ok(())
        })?;
    }
}
