//! Verification code cache over an expiring store
//!
//! Every operation runs its read-decide-write sequence while holding the lock
//! stripe of its pair, on a spawned task. Dropping the caller's future
//! therefore never interrupts a sequence halfway: cancellation only takes
//! effect before the task starts or after it finishes.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use vc_shared::config::VerificationCodeConfig;
use vc_shared::phone::mask_phone_number;

use crate::clock::{Clock, SystemClock};
use crate::domain::entities::{AttemptCounter, AttemptStatus, CodeEntry};
use crate::domain::value_objects::CodeKeys;
use crate::errors::{CodeCacheError, CodeCacheResult};

use super::lock::StripedLock;
use super::traits::{CodeCache, ExpiringStore};

/// Which of the two entries of a pair an operation touches
#[derive(Debug, Clone, Copy)]
enum Record {
    Code,
    Counter,
}

impl Record {
    fn key(self, keys: &CodeKeys) -> &str {
        match self {
            Record::Code => &keys.code,
            Record::Counter => &keys.counter,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Record::Code => "code",
            Record::Counter => "counter",
        }
    }
}

/// A validated pair with its derived keys and a log-safe recipient
struct Target {
    biz: String,
    masked_phone: String,
    keys: CodeKeys,
}

/// Verification code cache enforcing cooldown, bounded attempts and
/// single-use consumption
///
/// Cloning is cheap and every clone shares the same store and locks.
pub struct CodeCacheService<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for CodeCacheService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    store: S,
    clock: Arc<dyn Clock>,
    locks: StripedLock,
    key_prefix: String,
    cooldown: Duration,
    max_attempts: u32,
}

impl<S: ExpiringStore + 'static> CodeCacheService<S> {
    /// Create a cache using the system clock
    pub fn new(store: S, config: VerificationCodeConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`
    pub fn with_clock(store: S, config: VerificationCodeConfig, clock: Arc<dyn Clock>) -> Self {
        let cooldown_secs = i64::try_from(config.cooldown_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);

        info!(
            cooldown_secs = config.cooldown_secs,
            max_attempts = config.max_attempts,
            lock_stripes = config.lock_stripes.max(1),
            "Verification code cache created"
        );

        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                locks: StripedLock::new(config.lock_stripes),
                key_prefix: config.key_prefix,
                cooldown: Duration::seconds(cooldown_secs),
                max_attempts: config.max_attempts,
            }),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Keys used for the pair, without validating it
    pub fn keys(&self, biz: &str, phone: &str) -> CodeKeys {
        CodeKeys::derive(&self.inner.key_prefix, biz, phone)
    }

    fn target(&self, biz: &str, phone: &str) -> CodeCacheResult<Target> {
        if biz.is_empty() {
            return Err(CodeCacheError::InvalidArgument { field: "biz" });
        }
        if phone.is_empty() {
            return Err(CodeCacheError::InvalidArgument { field: "phone" });
        }
        Ok(Target {
            biz: biz.to_string(),
            masked_phone: mask_phone_number(phone),
            keys: self.keys(biz, phone),
        })
    }

    /// Run a locked section to completion regardless of the caller
    async fn run_detached<T, F>(&self, section: F) -> CodeCacheResult<T>
    where
        T: Send + 'static,
        F: Future<Output = CodeCacheResult<T>> + Send + 'static,
    {
        match tokio::spawn(section).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Verification code task did not complete");
                Err(CodeCacheError::Unknown)
            }
        }
    }
}

#[async_trait]
impl<S: ExpiringStore + 'static> CodeCache for CodeCacheService<S> {
    async fn set(&self, biz: &str, phone: &str, code: &str) -> CodeCacheResult<()> {
        let target = self.target(biz, phone)?;
        let inner = Arc::clone(&self.inner);
        let code = code.to_string();
        self.run_detached(async move { inner.set_locked(&target, &code).await })
            .await
    }

    async fn verify(&self, biz: &str, phone: &str, code: &str) -> CodeCacheResult<bool> {
        let target = self.target(biz, phone)?;
        let inner = Arc::clone(&self.inner);
        let code = code.to_string();
        self.run_detached(async move { inner.verify_locked(&target, &code).await })
            .await
    }

    async fn remaining_attempts(
        &self,
        biz: &str,
        phone: &str,
    ) -> CodeCacheResult<Option<AttemptStatus>> {
        let target = self.target(biz, phone)?;
        let inner = Arc::clone(&self.inner);
        self.run_detached(async move {
            let _guard = inner.locks.lock(&target.keys.code).await;
            let counter: Option<AttemptCounter> = inner.read_live(&target, Record::Counter).await?;
            Ok(counter.map(|c| c.status))
        })
        .await
    }

    async fn clear(&self, biz: &str, phone: &str) -> CodeCacheResult<()> {
        let target = self.target(biz, phone)?;
        let inner = Arc::clone(&self.inner);
        self.run_detached(async move { inner.clear_locked(&target).await })
            .await
    }
}

impl<S: ExpiringStore> Inner<S> {
    async fn set_locked(&self, target: &Target, code: &str) -> CodeCacheResult<()> {
        let _guard = self.locks.lock(&target.keys.code).await;
        let now = self.clock.now();

        let existing = self
            .store
            .get(&target.keys.code)
            .await
            .map_err(|e| unknown(target, Record::Code, "read", e))?;

        if let Some(bytes) = existing {
            let entry: CodeEntry =
                decode(&bytes).map_err(|e| unknown(target, Record::Code, "decode", e))?;
            if entry.in_cooldown(now, self.cooldown) {
                debug!(
                    biz = %target.biz,
                    phone = %target.masked_phone,
                    issued_at = %entry.issued_at,
                    "Verification code requested inside cooldown window"
                );
                return Err(CodeCacheError::CodeSendTooMany);
            }
        }

        self.write(target, Record::Code, &CodeEntry::new(code, now))
            .await?;
        self.write(
            target,
            Record::Counter,
            &AttemptCounter::fresh(self.max_attempts, now),
        )
        .await?;

        info!(
            biz = %target.biz,
            phone = %target.masked_phone,
            "Verification code stored"
        );
        Ok(())
    }

    async fn verify_locked(&self, target: &Target, submitted: &str) -> CodeCacheResult<bool> {
        let _guard = self.locks.lock(&target.keys.code).await;

        let Some(mut counter) = self.read_live::<AttemptCounter>(target, Record::Counter).await?
        else {
            debug!(
                biz = %target.biz,
                phone = %target.masked_phone,
                "No active verification code"
            );
            return Ok(false);
        };

        if !counter.status.can_verify() {
            warn!(
                biz = %target.biz,
                phone = %target.masked_phone,
                status = ?counter.status,
                "Verification rejected, no attempts left"
            );
            return Err(CodeCacheError::CodeVerifyTooManyTimes);
        }

        let Some(entry) = self.read_live::<CodeEntry>(target, Record::Code).await? else {
            debug!(
                biz = %target.biz,
                phone = %target.masked_phone,
                "Verification code expired"
            );
            return Ok(false);
        };

        if !entry.matches(submitted) {
            counter.record_mismatch();
            warn!(
                biz = %target.biz,
                phone = %target.masked_phone,
                remaining = counter.status.remaining(),
                "Invalid verification code"
            );
            self.write_best_effort(target, &counter).await;
            return Ok(false);
        }

        counter.consume();
        self.write_best_effort(target, &counter).await;
        info!(
            biz = %target.biz,
            phone = %target.masked_phone,
            "Verification code validated"
        );
        Ok(true)
    }

    async fn clear_locked(&self, target: &Target) -> CodeCacheResult<()> {
        let _guard = self.locks.lock(&target.keys.code).await;

        for record in [Record::Code, Record::Counter] {
            self.store
                .delete(record.key(&target.keys))
                .await
                .map_err(|e| unknown(target, record, "delete", e))?;
        }

        info!(
            biz = %target.biz,
            phone = %target.masked_phone,
            "Verification data cleared"
        );
        Ok(())
    }

    /// Read and decode an entry; absent and expired both yield `None`
    async fn read_live<T: DeserializeOwned>(
        &self,
        target: &Target,
        record: Record,
    ) -> CodeCacheResult<Option<T>> {
        let entry = self
            .store
            .get_with_info(record.key(&target.keys))
            .await
            .map_err(|e| unknown(target, record, "read", e))?;

        match entry {
            Some(entry) if !entry.expired => decode(&entry.value)
                .map(Some)
                .map_err(|e| unknown(target, record, "decode", e)),
            _ => Ok(None),
        }
    }

    async fn write<T: Serialize>(
        &self,
        target: &Target,
        record: Record,
        value: &T,
    ) -> CodeCacheResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| unknown(target, record, "encode", e))?;
        self.store
            .set(record.key(&target.keys), &bytes)
            .await
            .map_err(|e| unknown(target, record, "write", e))
    }

    /// Persist a counter update whose failure must not change the outcome
    async fn write_best_effort(&self, target: &Target, counter: &AttemptCounter) {
        let result = match serde_json::to_vec(counter) {
            Ok(bytes) => self
                .store
                .set(&target.keys.counter, &bytes)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = result {
            warn!(
                biz = %target.biz,
                phone = %target.masked_phone,
                status = ?counter.status,
                error = %e,
                "Failed to persist verification attempt counter"
            );
        }
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    serde_json::from_slice(bytes)
}

/// Log a store failure with its cause and collapse it to `Unknown`
fn unknown(target: &Target, record: Record, action: &str, cause: impl Display) -> CodeCacheError {
    error!(
        biz = %target.biz,
        phone = %target.masked_phone,
        record = record.as_str(),
        action,
        error = %cause,
        "Verification code store failure"
    );
    CodeCacheError::Unknown
}
