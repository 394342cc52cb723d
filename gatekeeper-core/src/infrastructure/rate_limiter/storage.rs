//! Counter storage for rate limiting
//!
//! The [`CounterStore`] trait is the seam between the limiters and where
//! their bookkeeping lives. The only shipped backend is
//! [`BoundedCounterStore`], a per-process LRU cache with a global TTL.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::types::CounterState;
use crate::config::{StoreConfig, ValidationError};
use crate::infrastructure::clock::Clock;

/// Counter store failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    #[error("Counter state for key '{key}' has an unexpected shape")]
    Corrupt { key: String },
}

/// Read-modify-write closure handed to [`CounterStore::update`].
///
/// Receives the live value (absent if missing or expired) and returns the
/// value to persist.
pub type UpdateFn<'a> =
    dyn FnMut(Option<CounterState>) -> Result<CounterState, StorageError> + 'a;

/// Storage backend for rate limit bookkeeping
pub trait CounterStore: Send + Sync {
    /// Live value for `key`, marking it most recently used
    fn get(&self, key: &str) -> Result<Option<CounterState>, StorageError>;

    /// Live value for `key` without touching its recency
    fn peek(&self, key: &str) -> Result<Option<CounterState>, StorageError>;

    /// Insert or overwrite `key`
    fn set(&self, key: &str, value: CounterState) -> Result<(), StorageError>;

    /// Atomic read-modify-write of a single key
    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<CounterState, StorageError>;

    /// Returns whether a live entry was removed
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Number of entries currently held, expired ones included
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: CounterState,
    expires_at: u64,
}

/// In-memory store bounded by entry count (LRU) and entry age (TTL).
///
/// Every write stamps the entry with `now + ttl`; reads treat an entry past
/// that instant as absent and drop it. Capacity eviction happens only when
/// a new key is inserted into a full cache. There is no background sweep.
pub struct BoundedCounterStore {
    entries: Mutex<LruCache<String, StoredEntry>>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl BoundedCounterStore {
    pub fn new(capacity: NonZeroUsize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl_ms: ttl.as_millis() as u64,
            clock,
        }
    }

    pub fn from_config(
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ValidationError> {
        let capacity = NonZeroUsize::new(config.max_entries)
            .ok_or_else(|| ValidationError::store("max_entries must be greater than 0"))?;
        Ok(Self::new(
            capacity,
            Duration::from_secs(config.ttl_seconds),
            clock,
        ))
    }

    fn live_value(
        entries: &mut LruCache<String, StoredEntry>,
        key: &str,
        now: u64,
        promote: bool,
    ) -> Option<CounterState> {
        let found = if promote {
            entries.get(key)
        } else {
            entries.peek(key)
        };
        let expired = match found {
            Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            debug!(key = %key, "Counter entry expired");
        }
        None
    }

    fn insert(
        &self,
        entries: &mut LruCache<String, StoredEntry>,
        key: &str,
        value: CounterState,
        now: u64,
    ) {
        let entry = StoredEntry {
            value,
            expires_at: now.saturating_add(self.ttl_ms),
        };
        if let Some((evicted, _)) = entries.push(key.to_string(), entry)
            && evicted != key
        {
            debug!(
                evicted = %evicted,
                inserted = %key,
                "Counter store at capacity, evicted least recently used key"
            );
        }
    }
}

impl CounterStore for BoundedCounterStore {
    fn get(&self, key: &str) -> Result<Option<CounterState>, StorageError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        Ok(Self::live_value(&mut entries, key, now, true))
    }

    fn peek(&self, key: &str) -> Result<Option<CounterState>, StorageError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        Ok(Self::live_value(&mut entries, key, now, false))
    }

    fn set(&self, key: &str, value: CounterState) -> Result<(), StorageError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        self.insert(&mut entries, key, value, now);
        Ok(())
    }

    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<CounterState, StorageError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        let current = Self::live_value(&mut entries, key, now, true);
        let next = f(current)?;
        self.insert(&mut entries, key, next.clone(), now);
        Ok(next)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        Ok(entries
            .pop(key)
            .is_some_and(|entry| now < entry.expires_at))
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::rate_limiter::types::CounterEntry;

    fn entry(count: u32) -> CounterState {
        CounterState::Fixed(CounterEntry {
            count,
            reset_time: 0,
        })
    }

    fn store(capacity: usize, ttl_ms: u64) -> (BoundedCounterStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = BoundedCounterStore::new(
            NonZeroUsize::new(capacity).unwrap(),
            Duration::from_millis(ttl_ms),
            clock.clone(),
        );
        (store, clock)
    }

    #[test]
    fn test_set_and_get() {
        let (store, _) = store(4, 1_000);
        store.set("a", entry(1)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(entry(1)));
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (store, _) = store(2, 1_000);
        store.set("a", entry(1)).unwrap();
        store.set("b", entry(1)).unwrap();
        store.set("a", entry(2)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.peek("b").unwrap(), Some(entry(1)));
    }

    #[test]
    fn test_peek_does_not_promote() {
        let (store, _) = store(2, 1_000);
        store.set("a", entry(1)).unwrap();
        store.set("b", entry(1)).unwrap();
        store.peek("a").unwrap();
        store.set("c", entry(1)).unwrap();
        assert_eq!(store.peek("a").unwrap(), None);
        assert!(store.peek("b").unwrap().is_some());
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (store, clock) = store(2, 1_000);
        store.set("a", entry(1)).unwrap();
        clock.set(999);
        assert!(store.get("a").unwrap().is_some());
        clock.set(1_999);
        assert_eq!(store.get("a").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_sees_absent_after_expiry() {
        let (store, clock) = store(2, 100);
        store.set("a", entry(7)).unwrap();
        clock.set(100);
        let persisted = store
            .update("a", &mut |current| {
                assert!(current.is_none());
                Ok(entry(1))
            })
            .unwrap();
        assert_eq!(persisted, entry(1));
    }

    #[test]
    fn test_update_error_leaves_value_untouched() {
        let (store, _) = store(2, 100);
        store.set("a", entry(3)).unwrap();
        let result = store.update("a", &mut |_| {
            Err(StorageError::Corrupt {
                key: "a".to_string(),
            })
        });
        assert!(result.is_err());
        assert_eq!(store.get("a").unwrap(), Some(entry(3)));
    }

    #[test]
    fn test_remove_reports_live_entries_only() {
        let (store, clock) = store(2, 100);
        store.set("a", entry(1)).unwrap();
        store.set("b", entry(1)).unwrap();
        assert!(store.remove("a").unwrap());
        clock.set(200);
        assert!(!store.remove("b").unwrap());
        assert!(!store.remove("missing").unwrap());
    }

    #[test]
    fn test_from_config_rejects_zero_capacity() {
        let config = StoreConfig {
            max_entries: 0,
            ttl_seconds: 10,
        };
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        assert!(BoundedCounterStore::from_config(&config, clock).is_err());
    }
}
