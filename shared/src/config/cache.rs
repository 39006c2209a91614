//! Store backend configuration
//!
//! Both backends expire entries after `ttl_secs`; that TTL must outlive the
//! verification cooldown, which [`AppConfig::validate`](super::AppConfig::validate)
//! enforces for the selected backend.

use serde::{Deserialize, Serialize};

/// Default entry TTL shared by both backends (10 minutes)
const DEFAULT_TTL_SECS: u64 = 600;

/// Redis connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis connection URL, credentials included
    pub url: String,

    /// Upper bound for establishing the connection, in seconds
    pub connect_timeout_secs: u64,

    /// Expiry set on every written key, in seconds
    pub ttl_secs: u64,

    /// Attempts per command before a transient failure is reported
    pub max_retries: u32,

    /// First backoff delay, doubled on each retry
    pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout_secs: 5,
            ttl_secs: DEFAULT_TTL_SECS,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl CacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_ttl(self, ttl_secs: u64) -> Self {
        Self { ttl_secs, ..self }
    }
}

/// Bounded in-process store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// Capacity; least valuable entries are evicted beyond it
    pub max_entries: u64,

    /// Age at which an entry reads as expired, in seconds
    pub ttl_secs: u64,

    /// Extra time an expired entry stays visible as expired before removal
    pub retain_expired_secs: u64,

    /// Largest accepted value in bytes
    pub max_value_bytes: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            ttl_secs: DEFAULT_TTL_SECS,
            retain_expired_secs: 60,
            max_value_bytes: 4096,
        }
    }
}

impl MemoryCacheConfig {
    pub fn with_ttl(self, ttl_secs: u64) -> Self {
        Self { ttl_secs, ..self }
    }

    pub fn with_max_entries(self, max_entries: u64) -> Self {
        Self {
            max_entries,
            ..self
        }
    }
}

/// Which backend holds verification codes, with settings for each
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheStrategyConfig {
    pub cache_type: CacheType,
    pub redis: CacheConfig,
    pub memory: MemoryCacheConfig,
}

impl CacheStrategyConfig {
    /// Entry TTL of the selected backend, in seconds
    pub fn entry_ttl_secs(&self) -> u64 {
        match self.cache_type {
            CacheType::Memory => self.memory.ttl_secs,
            CacheType::Redis => self.redis.ttl_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    Redis,
    #[default]
    Memory,
}
