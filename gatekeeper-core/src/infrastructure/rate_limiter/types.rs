//! Rate limiter types and core data structures

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::RateLimitStrategyKind;
use crate::domain::gatekeeper::{ClientIdentity, TierName};

/// Fixed-window bookkeeping for a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterEntry {
    /// Requests seen in the current window, including denied ones
    pub count: u32,
    /// End of the current window (Unix timestamp in milliseconds)
    pub reset_time: u64,
}

/// Sliding-window log: request timestamps in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampLog {
    timestamps: VecDeque<u64>,
}

impl TimestampLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every timestamp `<= now - window_ms`.
    pub fn prune(&mut self, now_ms: u64, window_ms: u64) {
        let Some(cutoff) = now_ms.checked_sub(window_ms) else {
            return;
        };
        while self.timestamps.front().is_some_and(|ts| *ts <= cutoff) {
            self.timestamps.pop_front();
        }
    }

    pub fn record(&mut self, now_ms: u64) {
        self.timestamps.push_back(now_ms);
    }

    pub fn oldest(&self) -> Option<u64> {
        self.timestamps.front().copied()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Value stored per key in the counter store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CounterState {
    Fixed(CounterEntry),
    Sliding(TimestampLog),
}

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum requests allowed in the window
    pub limit: u32,
    /// Remaining requests in the window
    pub remaining: u32,
    /// When the quota frees up (Unix timestamp in milliseconds)
    pub reset_at_ms: u64,
    /// The tier that was applied
    pub tier: TierName,
}

impl RateLimitDecision {
    pub fn allowed(limit: u32, remaining: u32, reset_at_ms: u64, tier: TierName) -> Self {
        Self {
            allowed: true,
            limit,
            remaining: remaining.min(limit),
            reset_at_ms,
            tier,
        }
    }

    pub fn denied(limit: u32, reset_at_ms: u64, tier: TierName) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at_ms,
            tier,
        }
    }

    /// Decision returned while rate limiting is switched off
    pub fn unlimited(tier: TierName) -> Self {
        Self::allowed(u32::MAX, u32::MAX, 0, tier)
    }

    /// Whole seconds until the quota frees up, never less than one.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000).max(1)
    }

    /// Reset time as Unix seconds, rounded up
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at_ms.div_ceil(1000)
    }
}

/// Read-only view of a key's quota usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitUsage {
    pub tier: TierName,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
    pub window_ms: u64,
}

/// Store key for a (strategy, tier, identity) triple
pub fn rate_limit_key(
    strategy: RateLimitStrategyKind,
    tier: TierName,
    identity: &ClientIdentity,
) -> String {
    format!("{}:{}:{}", strategy.as_str(), tier.as_str(), identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_drops_boundary_timestamp() {
        let mut log = TimestampLog::new();
        for ts in [100, 500, 900] {
            log.record(ts);
        }
        log.prune(1_500, 1_000);
        assert_eq!(log.len(), 1);
        assert_eq!(log.oldest(), Some(900));
    }

    #[test]
    fn test_prune_before_first_window_keeps_everything() {
        let mut log = TimestampLog::new();
        log.record(0);
        log.record(10);
        log.prune(500, 1_000);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_retry_after_rounds_up_and_is_at_least_one() {
        let decision = RateLimitDecision::denied(5, 10_001, TierName::Api);
        assert_eq!(decision.retry_after_secs(8_000), 3);
        assert_eq!(decision.retry_after_secs(10_001), 1);
        assert_eq!(decision.retry_after_secs(20_000), 1);
        assert_eq!(decision.reset_at_secs(), 11);
    }

    #[test]
    fn test_rate_limit_key_layout() {
        let key = rate_limit_key(
            RateLimitStrategyKind::FixedWindow,
            TierName::Search,
            &ClientIdentity::User("42".to_string()),
        );
        assert_eq!(key, "fixed_window:search:user:42");
    }

    #[test]
    fn test_counter_state_json_shape() {
        let state = CounterState::Fixed(CounterEntry {
            count: 3,
            reset_time: 1_000,
        });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["kind"], "fixed");
        assert_eq!(json["count"], 3);
    }
}
