//! Sliding Window Rate Limiter
//!
//! Keeps the exact timestamp of every allowed request inside the trailing
//! window. Stricter than the fixed window: there is no boundary burst, at
//! the cost of one timestamp per allowed request (at most `max_requests`).

use std::sync::Arc;

use tracing::debug;

use super::storage::{CounterStore, StorageError};
use super::strategy::RateLimitStrategy;
use super::types::{CounterState, RateLimitDecision, RateLimitUsage, TimestampLog};
use crate::config::{QuotaTier, RateLimitStrategyKind};
use crate::domain::gatekeeper::TierName;

/// Sliding-window log limiter
pub struct SlidingWindowLimiter {
    storage: Arc<dyn CounterStore>,
}

impl SlidingWindowLimiter {
    pub fn new(storage: Arc<dyn CounterStore>) -> Self {
        Self { storage }
    }

    fn current_log(
        key: &str,
        state: Option<CounterState>,
    ) -> Result<TimestampLog, StorageError> {
        match state {
            None => Ok(TimestampLog::new()),
            Some(CounterState::Sliding(log)) => Ok(log),
            Some(CounterState::Fixed(_)) => Err(StorageError::Corrupt {
                key: key.to_string(),
            }),
        }
    }
}

impl RateLimitStrategy for SlidingWindowLimiter {
    fn kind(&self) -> RateLimitStrategyKind {
        RateLimitStrategyKind::SlidingWindow
    }

    fn check(
        &self,
        key: &str,
        tier: TierName,
        quota: &QuotaTier,
        now_ms: u64,
    ) -> Result<RateLimitDecision, StorageError> {
        let max = quota.max_requests;
        let window = quota.window_ms;
        let mut decision = None;

        self.storage.update(key, &mut |state| {
            let mut log = Self::current_log(key, state)?;
            log.prune(now_ms, window);

            // Denied attempts still persist the pruned log.
            decision = Some(if log.len() >= max as usize {
                let oldest = log.oldest().unwrap_or(now_ms);
                RateLimitDecision::denied(max, oldest.saturating_add(window), tier)
            } else {
                log.record(now_ms);
                let oldest = log.oldest().unwrap_or(now_ms);
                let remaining = max.saturating_sub(log.len() as u32);
                RateLimitDecision::allowed(max, remaining, oldest.saturating_add(window), tier)
            });

            Ok(CounterState::Sliding(log))
        })?;

        let decision = decision.ok_or_else(|| {
            StorageError::Unavailable(format!("update of '{}' produced no state", key))
        })?;

        debug!(
            key = %key,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Sliding window check"
        );

        Ok(decision)
    }

    fn peek(
        &self,
        key: &str,
        tier: TierName,
        quota: &QuotaTier,
        now_ms: u64,
    ) -> Result<RateLimitUsage, StorageError> {
        let max = quota.max_requests;
        let mut log = Self::current_log(key, self.storage.peek(key)?)?;
        log.prune(now_ms, quota.window_ms);

        let used = (log.len() as u32).min(max);
        let reset_at_ms = log
            .oldest()
            .unwrap_or(now_ms)
            .saturating_add(quota.window_ms);

        Ok(RateLimitUsage {
            tier,
            limit: max,
            used,
            remaining: max - used,
            reset_at_ms,
            window_ms: quota.window_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::rate_limiter::storage::BoundedCounterStore;
    use std::num::NonZeroUsize;
    use std::time::Duration;

    fn limiter() -> (SlidingWindowLimiter, Arc<BoundedCounterStore>) {
        let store = Arc::new(BoundedCounterStore::new(
            NonZeroUsize::new(16).unwrap(),
            Duration::from_secs(3600),
            Arc::new(ManualClock::new(0)),
        ));
        (SlidingWindowLimiter::new(store.clone()), store)
    }

    #[test]
    fn test_allows_up_to_max_then_denies() {
        let (limiter, _) = limiter();
        let q = QuotaTier::new(1_000, 3, "slow down");
        for (i, remaining) in [2, 1, 0].into_iter().enumerate() {
            let decision = limiter
                .check("k", TierName::Search, &q, i as u64 * 10)
                .unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, remaining);
            assert_eq!(decision.reset_at_ms, 1_000);
        }
        let denied = limiter.check("k", TierName::Search, &q, 30).unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.reset_at_ms, 1_000);
    }

    #[test]
    fn test_oldest_timestamp_leaves_window() {
        let (limiter, _) = limiter();
        let q = QuotaTier::new(1_000, 2, "slow down");
        limiter.check("k", TierName::Search, &q, 0).unwrap();
        limiter.check("k", TierName::Search, &q, 600).unwrap();
        assert!(!limiter.check("k", TierName::Search, &q, 999).unwrap().allowed);
        // t=0 is pruned once now - window >= 0
        let decision = limiter.check("k", TierName::Search, &q, 1_000).unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.reset_at_ms, 1_600);
    }

    #[test]
    fn test_denied_attempts_do_not_consume_quota() {
        let (limiter, store) = limiter();
        let q = QuotaTier::new(1_000, 1, "slow down");
        limiter.check("k", TierName::Search, &q, 0).unwrap();
        for t in 1..5 {
            assert!(!limiter.check("k", TierName::Search, &q, t).unwrap().allowed);
        }
        match store.peek("k").unwrap() {
            Some(CounterState::Sliding(log)) => assert_eq!(log.len(), 1),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_peek_reports_usage_without_recording() {
        let (limiter, _) = limiter();
        let q = QuotaTier::new(1_000, 5, "slow down");
        limiter.check("k", TierName::Search, &q, 100).unwrap();
        limiter.check("k", TierName::Search, &q, 200).unwrap();
        let usage = limiter.peek("k", TierName::Search, &q, 300).unwrap();
        assert_eq!(usage.used, 2);
        assert_eq!(usage.remaining, 3);
        assert_eq!(usage.reset_at_ms, 1_100);
        assert_eq!(limiter.peek("k", TierName::Search, &q, 300).unwrap(), usage);
    }
}
