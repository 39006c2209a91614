//! Bounded in-process expiring store
//!
//! Entries live in a `moka` cache capped at `max_entries` with LRU eviction:
//! a new entry is always admitted and the least recently used entries make
//! room for it, so an acknowledged write is never dropped in favour of older,
//! frequently read ones.
//!
//! Expiry is tracked per entry against the injected [`Clock`]: once an entry
//! is older than `ttl_secs` it reads as expired, and moka physically drops it
//! `retain_expired_secs` later.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::{debug, warn};
use vc_core::clock::{Clock, SystemClock};
use vc_core::errors::{StoreError, StoreResult};
use vc_core::services::{ExpiringStore, StoreEntry};
use vc_shared::config::MemoryCacheConfig;

/// Upper bound accepted by moka for `time_to_live`
const MAX_PHYSICAL_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug)]
struct StoredValue {
    bytes: Vec<u8>,
    written_at: DateTime<Utc>,
}

/// In-memory [`ExpiringStore`] with a capacity bound and per-entry TTL
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, Arc<StoredValue>>,
    ttl: Duration,
    max_value_bytes: usize,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store whose expiry decisions follow `clock`
    pub fn with_clock(config: &MemoryCacheConfig, clock: Arc<dyn Clock>) -> Self {
        let physical_ttl = config
            .ttl_secs
            .saturating_add(config.retain_expired_secs)
            .min(MAX_PHYSICAL_TTL_SECS);

        debug!(
            max_entries = config.max_entries,
            ttl_secs = config.ttl_secs,
            retain_expired_secs = config.retain_expired_secs,
            "Creating in-memory store"
        );

        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(StdDuration::from_secs(physical_ttl))
            .build();

        Self {
            entries,
            ttl: Duration::seconds(config.ttl_secs.min(MAX_PHYSICAL_TTL_SECS) as i64),
            max_value_bytes: config.max_value_bytes,
            clock,
        }
    }

    /// Number of entries currently held, expired ones included
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    fn is_expired(&self, value: &StoredValue) -> bool {
        self.clock.now().signed_duration_since(value.written_at) >= self.ttl
    }
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .entries
            .get(key)
            .filter(|value| !self.is_expired(value))
            .map(|value| value.bytes.clone()))
    }

    async fn get_with_info(&self, key: &str) -> StoreResult<Option<StoreEntry>> {
        Ok(self.entries.get(key).map(|value| StoreEntry {
            value: value.bytes.clone(),
            expired: self.is_expired(&value),
        }))
    }

    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if value.len() > self.max_value_bytes {
            warn!(
                size = value.len(),
                max = self.max_value_bytes,
                "Rejected oversized cache value"
            );
            return Err(StoreError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_bytes,
            });
        }

        self.entries.insert(
            key.to_string(),
            Arc::new(StoredValue {
                bytes: value.to_vec(),
                written_at: self.clock.now(),
            }),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}
