//! Rate Limiting Infrastructure
//!
//! This module provides:
//! - Fixed-window counter limiting (cheap, allows a 2x burst at window boundaries)
//! - Sliding-window log limiting (exact per-window accounting)
//! - A bounded in-memory counter store with LRU eviction and a global TTL
//! - A service that binds one strategy to the tier table

pub mod fixed_window;
pub mod service;
pub mod sliding_window;
pub mod storage;
pub mod strategy;
pub mod types;

pub use fixed_window::FixedWindowLimiter;
pub use service::RateLimiterService;
pub use sliding_window::SlidingWindowLimiter;
pub use storage::{BoundedCounterStore, CounterStore, StorageError, UpdateFn};
pub use strategy::RateLimitStrategy;
pub use types::{
    CounterEntry, CounterState, RateLimitDecision, RateLimitUsage, TimestampLog, rate_limit_key,
};
