//! Integration tests for the verification code cache over Redis
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p vc_infra --test redis_integration -- --ignored
#![cfg(feature = "redis-cache")]

use vc_core::errors::CodeCacheError;
use vc_core::services::{CodeCache, CodeCacheService, ExpiringStore};
use vc_infra::cache::{CacheConfig, CodeStore, RedisClient};
use vc_shared::config::VerificationCodeConfig;

fn redis_config() -> CacheConfig {
    CacheConfig::new(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
    )
    .with_ttl(600)
}

fn test_config() -> VerificationCodeConfig {
    VerificationCodeConfig {
        key_prefix: format!("test_phone_code_{}", std::process::id()),
        ..VerificationCodeConfig::default()
    }
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_redis_health_check() {
    let client = RedisClient::new(&redis_config()).await.unwrap();
    assert!(client.health_check().await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_store_operations() {
    let client = RedisClient::new(&redis_config()).await.unwrap();
    let key = format!("test:store:{}", std::process::id());

    client.set(&key, b"value").await.unwrap();
    assert_eq!(client.get(&key).await.unwrap(), Some(b"value".to_vec()));

    let entry = client.get_with_info(&key).await.unwrap().unwrap();
    assert!(!entry.expired);

    assert!(client.delete(&key).await.unwrap());
    assert_eq!(client.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_verification_flow() {
    let client = RedisClient::new(&redis_config()).await.unwrap();
    let cache = CodeCacheService::new(CodeStore::from(client), test_config());
    let phone = "13800138000";

    cache.clear("login", phone).await.unwrap();
    cache.set("login", phone, "123456").await.unwrap();
    assert_eq!(
        cache.set("login", phone, "654321").await,
        Err(CodeCacheError::CodeSendTooMany)
    );

    assert_eq!(cache.verify("login", phone, "000000").await, Ok(false));
    assert_eq!(cache.verify("login", phone, "123456").await, Ok(true));
    assert_eq!(
        cache.verify("login", phone, "123456").await,
        Err(CodeCacheError::CodeVerifyTooManyTimes)
    );

    cache.clear("login", phone).await.unwrap();
}
