//! Common interface of the rate limiting algorithms

use super::storage::StorageError;
use super::types::{RateLimitDecision, RateLimitUsage};
use crate::config::{QuotaTier, RateLimitStrategyKind};
use crate::domain::gatekeeper::TierName;

/// A rate limiting algorithm backed by a counter store.
///
/// `check` counts the attempt whether or not it is allowed; `peek` never
/// mutates.
pub trait RateLimitStrategy: Send + Sync {
    fn kind(&self) -> RateLimitStrategyKind;

    fn check(
        &self,
        key: &str,
        tier: TierName,
        quota: &QuotaTier,
        now_ms: u64,
    ) -> Result<RateLimitDecision, StorageError>;

    fn peek(
        &self,
        key: &str,
        tier: TierName,
        quota: &QuotaTier,
        now_ms: u64,
    ) -> Result<RateLimitUsage, StorageError>;
}
