//! Fixed Window Rate Limiter
//!
//! Counts requests per key until the window's reset time, then replaces the
//! counter wholesale. A client can therefore get up to twice the quota
//! through by bursting on both sides of a window boundary.

use std::sync::Arc;

use tracing::debug;

use super::storage::{CounterStore, StorageError};
use super::strategy::RateLimitStrategy;
use super::types::{CounterEntry, CounterState, RateLimitDecision, RateLimitUsage};
use crate::config::{QuotaTier, RateLimitStrategyKind, WindowAlignment};
use crate::domain::gatekeeper::TierName;

/// Fixed-window counter limiter
pub struct FixedWindowLimiter {
    storage: Arc<dyn CounterStore>,
    alignment: WindowAlignment,
}

impl FixedWindowLimiter {
    pub fn new(storage: Arc<dyn CounterStore>, alignment: WindowAlignment) -> Self {
        Self { storage, alignment }
    }

    /// End of a window opened at `now_ms`
    fn window_end(&self, now_ms: u64, window_ms: u64) -> u64 {
        match self.alignment {
            WindowAlignment::Rolling => now_ms.saturating_add(window_ms),
            WindowAlignment::Aligned => {
                let offset = now_ms.checked_rem(window_ms).unwrap_or(0);
                (now_ms - offset).saturating_add(window_ms)
            }
        }
    }

    fn current_entry(
        key: &str,
        state: Option<CounterState>,
    ) -> Result<Option<CounterEntry>, StorageError> {
        match state {
            None => Ok(None),
            Some(CounterState::Fixed(entry)) => Ok(Some(entry)),
            Some(CounterState::Sliding(_)) => Err(StorageError::Corrupt {
                key: key.to_string(),
            }),
        }
    }
}

impl RateLimitStrategy for FixedWindowLimiter {
    fn kind(&self) -> RateLimitStrategyKind {
        RateLimitStrategyKind::FixedWindow
    }

    fn check(
        &self,
        key: &str,
        tier: TierName,
        quota: &QuotaTier,
        now_ms: u64,
    ) -> Result<RateLimitDecision, StorageError> {
        let max = quota.max_requests;
        let mut decision = None;

        self.storage.update(key, &mut |state| {
            let entry = match Self::current_entry(key, state)? {
                Some(mut entry) if now_ms <= entry.reset_time => {
                    entry.count = entry.count.saturating_add(1);
                    entry
                }
                _ => CounterEntry {
                    count: 1,
                    reset_time: self.window_end(now_ms, quota.window_ms),
                },
            };

            decision = Some(if entry.count > max {
                RateLimitDecision::denied(max, entry.reset_time, tier)
            } else {
                RateLimitDecision::allowed(max, max - entry.count, entry.reset_time, tier)
            });

            Ok(CounterState::Fixed(entry))
        })?;

        let decision = decision.ok_or_else(|| {
            StorageError::Unavailable(format!("update of '{}' produced no state", key))
        })?;

        debug!(
            key = %key,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Fixed window check"
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
        let (used, reset_at_ms) = match Self::current_entry(key, self.storage.peek(key)?)? {
            Some(entry) if now_ms <= entry.reset_time => {
                (entry.count.min(max), entry.reset_time)
            }
            _ => (0, self.window_end(now_ms, quota.window_ms)),
        };

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
