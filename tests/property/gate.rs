//! Property tests for the concurrency gate.
//!
//! Invariants tested:
//! - Never more than `capacity` operations hold a slot at once
//! - Every slot is returned when the work is done

use super::paused_runtime;
use intake_resilience_gate::ConcurrencyGate;
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: concurrency stays within capacity
    #[test]
    fn concurrency_stays_within_capacity(
        capacity in 1usize..8,
        durations in prop::collection::vec(0u64..50, 1..40),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let gate = ConcurrencyGate::with_capacity(capacity);
            let running = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let work = durations.iter().map(|ms| {
                let (gate, running, peak) = (gate.clone(), Arc::clone(&running), Arc::clone(&peak));
                let ms = *ms;
                async move {
                    gate.run(async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                }
            });
            let results = futures::future::join_all(work).await;

            prop_assert!(results.iter().all(Result::is_ok));
            prop_assert!(peak.load(Ordering::SeqCst) <= capacity);
            prop_assert!(gate.peak() <= capacity);
            prop_assert_eq!(gate.held(), 0);
            prop_assert_eq!(gate.available(), capacity);
            Ok(())
        })?;
    }
}
