//! Verification code cache wired to a configured store
//!
//! The store backend is picked at runtime from [`CacheStrategyConfig`]:
//!
//! - `memory` - bounded in-process [`MemoryStore`]
//! - `redis` - shared [`RedisClient`] (feature `redis-cache`)
//!
//! [`CacheStrategyConfig`]: vc_shared::config::CacheStrategyConfig

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vc_core::clock::Clock;
use vc_core::errors::StoreResult;
use vc_core::services::{CodeCacheService, ExpiringStore, StoreEntry};
use vc_shared::config::{AppConfig, CacheType, MemoryCacheConfig, VerificationCodeConfig};

use super::MemoryStore;
#[cfg(feature = "redis-cache")]
use super::RedisClient;
use crate::InfrastructureError;

/// Store backend selected by configuration
#[derive(Clone)]
pub enum CodeStore {
    Memory(MemoryStore),
    #[cfg(feature = "redis-cache")]
    Redis(RedisClient),
}

impl CodeStore {
    pub fn kind(&self) -> CacheType {
        match self {
            CodeStore::Memory(_) => CacheType::Memory,
            #[cfg(feature = "redis-cache")]
            CodeStore::Redis(_) => CacheType::Redis,
        }
    }
}

impl From<MemoryStore> for CodeStore {
    fn from(store: MemoryStore) -> Self {
        CodeStore::Memory(store)
    }
}

#[cfg(feature = "redis-cache")]
impl From<RedisClient> for CodeStore {
    fn from(client: RedisClient) -> Self {
        CodeStore::Redis(client)
    }
}

#[async_trait]
impl ExpiringStore for CodeStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match self {
            CodeStore::Memory(store) => store.get(key).await,
            #[cfg(feature = "redis-cache")]
            CodeStore::Redis(client) => client.get(key).await,
        }
    }

    async fn get_with_info(&self, key: &str) -> StoreResult<Option<StoreEntry>> {
        match self {
            CodeStore::Memory(store) => store.get_with_info(key).await,
            #[cfg(feature = "redis-cache")]
            CodeStore::Redis(client) => client.get_with_info(key).await,
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        match self {
            CodeStore::Memory(store) => store.set(key, value).await,
            #[cfg(feature = "redis-cache")]
            CodeStore::Redis(client) => client.set(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        match self {
            CodeStore::Memory(store) => store.delete(key).await,
            #[cfg(feature = "redis-cache")]
            CodeStore::Redis(client) => client.delete(key).await,
        }
    }
}

/// Verification code cache over the configured store
pub type VerificationCache = CodeCacheService<CodeStore>;

/// Build the cache described by `config`, connecting to Redis if selected
pub async fn build_verification_cache(
    config: &AppConfig,
) -> Result<VerificationCache, InfrastructureError> {
    config.validate()?;

    let store = match config.cache.cache_type {
        CacheType::Memory => CodeStore::Memory(MemoryStore::new(&config.cache.memory)),
        #[cfg(feature = "redis-cache")]
        CacheType::Redis => CodeStore::Redis(RedisClient::new(&config.cache.redis).await?),
        #[cfg(not(feature = "redis-cache"))]
        CacheType::Redis => {
            return Err(InfrastructureError::Config(
                "cache_type = redis requires the redis-cache feature".to_string(),
            ))
        }
    };

    info!(store = ?store.kind(), "Verification cache store ready");
    Ok(CodeCacheService::new(store, config.verification.clone()))
}

/// In-process cache whose store and cooldown both follow `clock`
pub fn in_memory_verification_cache(
    memory: &MemoryCacheConfig,
    verification: VerificationCodeConfig,
    clock: Arc<dyn Clock>,
) -> VerificationCache {
    let store = MemoryStore::with_clock(memory, Arc::clone(&clock));
    CodeCacheService::with_clock(CodeStore::Memory(store), verification, clock)
}
