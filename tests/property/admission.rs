//! Property tests for admission control.
//!
//! Invariants tested:
//! - No identity is admitted more than its budget within one window
//! - Every identity gets its full budget regardless of others
//! - The budget is available again after the window rolls

use super::paused_runtime;
use intake_resilience_admission::{AdmissionController, FixedLimit, Identity};
use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: per-identity admissions equal min(arrivals, budget)
    #[test]
    fn admits_up_to_the_budget_per_identity(
        limit in 1usize..20,
        arrivals in prop::collection::vec(0u8..5, 0..120),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let admission = AdmissionController::builder()
                .window(Duration::from_secs(60))
                .build(FixedLimit(limit));

            let mut admitted: HashMap<u8, usize> = HashMap::new();
            let mut sent: HashMap<u8, usize> = HashMap::new();
            for user in &arrivals {
                *sent.entry(*user).or_default() += 1;
                let identity = Identity::Principal(format!("user-{user}"));
                if admission.admit(&identity).await.is_ok() {
                    *admitted.entry(*user).or_default() += 1;
                }
            }

            for (user, count) in &sent {
                prop_assert_eq!(admitted.get(user).copied().unwrap_or(0), (*count).min(limit));
            }
            prop_assert_eq!(admission.tracked_identities(), sent.len());
            Ok(())
        })?;
    }

    /// Property: a spent budget refills at the next window
    #[test]
    fn budget_refills_each_window(
        limit in 1usize..10,
        window_secs in 1u64..120,
        windows in 1usize..5,
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let admission = AdmissionController::builder()
                .window(Duration::from_secs(window_secs))
                .build(FixedLimit(limit));
            let caller = Identity::Principal("batch-client".into());

            for _ in 0..windows {
                for _ in 0..limit {
                    prop_assert!(admission.admit(&caller).await.is_ok());
                }
                let throttled = admission.admit(&caller).await;
                prop_assert!(throttled.is_err());
                tokio::time::advance(Duration::from_secs(window_secs)).await;
            }
            Ok(())
        })?;
    }
}
