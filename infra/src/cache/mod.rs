//! Cache module for verification code storage
//!
//! Provides the [`ExpiringStore`](vc_core::services::ExpiringStore) backends
//! and the wiring that turns configuration into a ready cache.

pub mod memory_store;
#[cfg(feature = "redis-cache")]
pub mod redis_client;
pub mod verification_cache;


pub use memory_store::MemoryStore;
#[cfg(feature = "redis-cache")]
pub use redis_client::RedisClient;
pub use verification_cache::{
    build_verification_cache, in_memory_verification_cache, CodeStore, VerificationCache,
};

// Re-export commonly used types
pub use vc_shared::config::{CacheConfig, MemoryCacheConfig};
