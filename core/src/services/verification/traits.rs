//! Seams between the verification code cache, its store and its callers

use async_trait::async_trait;

use crate::domain::entities::AttemptStatus;
use crate::errors::{CodeCacheResult, StoreResult};

/// A value read together with its expiry state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub value: Vec<u8>,
    /// The entry outlived its TTL but has not been evicted yet
    pub expired: bool,
}

/// Bounded key-value store with per-entry time-to-live
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Read a live entry; `None` if absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Read an entry, telling expired-but-present apart from absent
    async fn get_with_info(&self, key: &str) -> StoreResult<Option<StoreEntry>>;

    /// Overwrite an entry and restart its TTL
    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove an entry; `true` if something was removed
    async fn delete(&self, key: &str) -> StoreResult<bool>;
}

/// Issue and verify one-time codes per (business domain, recipient) pair
#[async_trait]
pub trait CodeCache: Send + Sync {
    /// Store a new code unless the previous one is still inside its cooldown
    async fn set(&self, biz: &str, phone: &str, code: &str) -> CodeCacheResult<()>;

    /// Check a submitted code, spending one attempt when it is wrong
    ///
    /// `Ok(false)` covers both "no active code" and "wrong code".
    async fn verify(&self, biz: &str, phone: &str, code: &str) -> CodeCacheResult<bool>;

    /// Attempt status of the active code, `None` if there is none
    async fn remaining_attempts(
        &self,
        biz: &str,
        phone: &str,
    ) -> CodeCacheResult<Option<AttemptStatus>>;

    /// Drop the code and its counter
    async fn clear(&self, biz: &str, phone: &str) -> CodeCacheResult<()>;
}
