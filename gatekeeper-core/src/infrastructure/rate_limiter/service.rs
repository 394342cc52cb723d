//! Rate Limiter Service
//!
//! Owns the counter store and exactly one strategy, picked from
//! configuration at construction time. Every route that goes through the
//! same service is counted by that one algorithm, never by both.

use std::sync::Arc;

use tracing::{debug, info};

use super::fixed_window::FixedWindowLimiter;
use super::sliding_window::SlidingWindowLimiter;
use super::storage::{BoundedCounterStore, CounterStore, StorageError};
use super::strategy::RateLimitStrategy;
use super::types::{RateLimitDecision, RateLimitUsage, rate_limit_key};
use crate::config::{
    QuotaTier, RateLimitConfig, RateLimitStrategyKind, StoreConfig, ValidationError,
};
use crate::domain::gatekeeper::{ClientIdentity, TierName};
use crate::infrastructure::clock::Clock;

/// Main rate limiter service
pub struct RateLimiterService {
    strategy: Box<dyn RateLimitStrategy>,
    storage: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl RateLimiterService {
    /// Create a service backed by a fresh in-memory bounded store
    pub fn new(
        config: RateLimitConfig,
        store: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ValidationError> {
        let storage = BoundedCounterStore::from_config(store, Arc::clone(&clock))?;
        info!(
            strategy = %config.strategy,
            max_entries = store.max_entries,
            ttl_seconds = store.ttl_seconds,
            "Rate limiter using in-memory bounded store"
        );
        Ok(Self::with_storage(Arc::new(storage), config, clock))
    }

    /// Create with a custom storage backend
    pub fn with_storage(
        storage: Arc<dyn CounterStore>,
        config: RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let strategy: Box<dyn RateLimitStrategy> = match config.strategy {
            RateLimitStrategyKind::FixedWindow => Box::new(FixedWindowLimiter::new(
                Arc::clone(&storage),
                config.fixed_window_alignment,
            )),
            RateLimitStrategyKind::SlidingWindow => {
                Box::new(SlidingWindowLimiter::new(Arc::clone(&storage)))
            }
        };

        Self {
            strategy,
            storage,
            clock,
            config,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn strategy(&self) -> RateLimitStrategyKind {
        self.strategy.kind()
    }

    pub fn quota(&self, tier: TierName) -> &QuotaTier {
        self.config.tiers.get(tier)
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Number of keys currently tracked by the store
    pub fn tracked_keys(&self) -> usize {
        self.storage.len()
    }

    /// Count one attempt for `identity` against `tier`
    pub fn check(
        &self,
        identity: &ClientIdentity,
        tier: TierName,
    ) -> Result<RateLimitDecision, StorageError> {
        self.check_at(identity, tier, self.clock.now_millis())
    }

    /// Count one attempt at `now_ms`, which must be a reading of this
    /// service's clock.
    pub(crate) fn check_at(
        &self,
        identity: &ClientIdentity,
        tier: TierName,
        now_ms: u64,
    ) -> Result<RateLimitDecision, StorageError> {
        if !self.config.enabled {
            return Ok(RateLimitDecision::unlimited(tier));
        }

        let key = rate_limit_key(self.strategy.kind(), tier, identity);
        let decision = self.strategy.check(&key, tier, self.quota(tier), now_ms)?;

        debug!(
            identity = %identity,
            tier = %tier,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Rate limit check"
        );

        Ok(decision)
    }

    /// Current usage for `identity` against `tier`, without counting.
    pub fn status(
        &self,
        identity: &ClientIdentity,
        tier: TierName,
    ) -> Result<RateLimitUsage, StorageError> {
        let quota = self.quota(tier);
        if !self.config.enabled {
            return Ok(RateLimitUsage {
                tier,
                limit: u32::MAX,
                used: 0,
                remaining: u32::MAX,
                reset_at_ms: 0,
                window_ms: quota.window_ms,
            });
        }

        let key = rate_limit_key(self.strategy.kind(), tier, identity);
        self.strategy
            .peek(&key, tier, quota, self.clock.now_millis())
    }

    /// Forget all bookkeeping for `identity` against `tier`
    pub fn reset(&self, identity: &ClientIdentity, tier: TierName) -> Result<bool, StorageError> {
        let key = rate_limit_key(self.strategy.kind(), tier, identity);
        self.storage.remove(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;

    fn service(config: RateLimitConfig) -> (RateLimiterService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let service =
            RateLimiterService::new(config, &StoreConfig::default(), clock.clone()).unwrap();
        (service, clock)
    }

    #[test]
    fn test_disabled_service_is_unlimited() {
        let (service, _) = service(RateLimitConfig {
            enabled: false,
            ..Default::default()
        });
        let identity = ClientIdentity::Anonymous;
        for _ in 0..10 {
            let decision = service.check(&identity, TierName::Auth).unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.limit, u32::MAX);
        }
        assert_eq!(service.tracked_keys(), 0);
    }

    #[test]
    fn test_tiers_are_counted_separately() {
        let (service, _) = service(RateLimitConfig::default());
        let identity = ClientIdentity::Ip("10.0.0.1".to_string());
        for _ in 0..5 {
            assert!(service.check(&identity, TierName::Auth).unwrap().allowed);
        }
        assert!(!service.check(&identity, TierName::Auth).unwrap().allowed);
        assert!(service.check(&identity, TierName::Api).unwrap().allowed);
    }

    #[test]
    fn test_status_does_not_consume_quota() {
        let (service, _) = service(RateLimitConfig::default());
        let identity = ClientIdentity::User("7".to_string());
        service.check(&identity, TierName::Auth).unwrap();
        for _ in 0..10 {
            let usage = service.status(&identity, TierName::Auth).unwrap();
            assert_eq!(usage.used, 1);
            assert_eq!(usage.remaining, 4);
        }
    }

    #[test]
    fn test_reset_clears_identity() {
        let (service, _) = service(RateLimitConfig::default());
        let identity = ClientIdentity::User("7".to_string());
        service.check(&identity, TierName::Auth).unwrap();
        assert!(service.reset(&identity, TierName::Auth).unwrap());
        assert_eq!(service.status(&identity, TierName::Auth).unwrap().used, 0);
    }

    #[test]
    fn test_strategy_follows_config() {
        let (service, _) = service(RateLimitConfig {
            strategy: RateLimitStrategyKind::FixedWindow,
            ..Default::default()
        });
        assert_eq!(service.strategy(), RateLimitStrategyKind::FixedWindow);
    }
}
