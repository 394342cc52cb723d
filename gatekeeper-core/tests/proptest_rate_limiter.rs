//! Property-based tests for the rate limiting algorithms

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use gatekeeper_core::config::{QuotaTier, WindowAlignment};
use gatekeeper_core::domain::gatekeeper::TierName;
use gatekeeper_core::infrastructure::clock::ManualClock;
use gatekeeper_core::infrastructure::rate_limiter::{
    BoundedCounterStore, FixedWindowLimiter, RateLimitStrategy, SlidingWindowLimiter,
};

fn storage() -> Arc<BoundedCounterStore> {
    Arc::new(BoundedCounterStore::new(
        NonZeroUsize::new(64).unwrap(),
        Duration::from_secs(86_400),
        Arc::new(ManualClock::new(0)),
    ))
}

fn limiters() -> Vec<Box<dyn RateLimitStrategy>> {
    vec![
        Box::new(FixedWindowLimiter::new(storage(), WindowAlignment::Rolling)),
        Box::new(FixedWindowLimiter::new(storage(), WindowAlignment::Aligned)),
        Box::new(SlidingWindowLimiter::new(storage())),
    ]
}

proptest! {
    #[test]
    fn test_remaining_stays_within_limit(
        max_requests in 1u32..20,
        window_ms in 1u64..5_000,
        gaps in prop::collection::vec(0u64..2_000, 1..80),
        keys in prop::collection::vec(0usize..3, 1..80),
    ) {
        let quota = QuotaTier::new(window_ms, max_requests, "limited");
        for limiter in limiters() {
            let mut now = 0u64;
            for (gap, key) in gaps.iter().zip(keys.iter().cycle()) {
                now += gap;
                let key = format!("k{}", key);
                let decision = limiter.check(&key, TierName::Api, &quota, now).unwrap();
                prop_assert!(decision.remaining <= max_requests);
                prop_assert_eq!(decision.limit, max_requests);
                if !decision.allowed {
                    prop_assert_eq!(decision.remaining, 0);
                }

                let usage = limiter.peek(&key, TierName::Api, &quota, now).unwrap();
                prop_assert!(usage.remaining <= max_requests);
                prop_assert_eq!(usage.used + usage.remaining, max_requests);
            }
        }
    }

    #[test]
    fn test_sliding_window_never_exceeds_limit_in_any_window(
        max_requests in 1u32..10,
        window_ms in 10u64..1_000,
        gaps in prop::collection::vec(0u64..300, 1..100),
    ) {
        let quota = QuotaTier::new(window_ms, max_requests, "limited");
        let limiter = SlidingWindowLimiter::new(storage());
        let mut now = 0u64;
        let mut accepted: Vec<u64> = Vec::new();

        for gap in gaps {
            now += gap;
            if limiter.check("k", TierName::Api, &quota, now).unwrap().allowed {
                accepted.push(now);
            }
            let in_window = accepted
                .iter()
                .filter(|t| now.saturating_sub(window_ms) < **t)
                .count();
            prop_assert!(in_window <= max_requests as usize);
        }
    }
}
