//! Redis-backed expiring store
//!
//! Shares verification codes between processes. Every write is a `SET EX`
//! with the configured entry TTL; Redis drops keys once they expire, so reads
//! see an entry as either live or absent, never as expired.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, ErrorKind, RedisError, RedisResult};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use vc_core::errors::{StoreError, StoreResult};
use vc_core::services::{ExpiringStore, StoreEntry};
use vc_shared::config::CacheConfig;

use crate::InfrastructureError;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Longest pause between two attempts
const MAX_BACKOFF_MS: u64 = 5_000;

/// Attempt budget with exponential backoff
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) attempts: u32,
    pub(crate) base_delay_ms: u64,
}

impl RetryPolicy {
    fn from_config(config: &CacheConfig) -> Self {
        Self {
            attempts: config.max_retries.max(1),
            base_delay_ms: config.retry_delay_ms,
        }
    }

    /// Pause before attempt `attempt + 1`
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
    }
}

/// Redis client implementing [`ExpiringStore`]
///
/// Clones share one multiplexed connection. Transient failures are retried
/// with exponential backoff before surfacing as [`StoreError::Backend`].
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
    /// TTL of every written key, in seconds
    entry_ttl_secs: u64,
    retry: RetryPolicy,
}

impl RedisClient {
    /// Connect to the Redis server named in `config`
    ///
    /// Connection attempts are retried and the whole sequence is bounded by
    /// `config.connect_timeout_secs` seconds.
    ///
    /// # Example
    /// ```no_run
    /// use vc_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn connect() -> Result<RedisClient, vc_infra::InfrastructureError> {
    ///     RedisClient::new(&CacheConfig::new("redis://localhost:6379")).await
    /// }
    /// ```
    pub async fn new(config: &CacheConfig) -> Result<Self, InfrastructureError> {
        let url = mask_url(&config.url);
        info!(url = %url, "Connecting to Redis");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!(url = %url, error = %e, "Invalid Redis URL");
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let retry = RetryPolicy::from_config(config);
        let limit = Duration::from_secs(config.connect_timeout_secs);
        let connection = timeout(limit, Self::connect(&client, retry))
            .await
            .map_err(|_| {
                error!(
                    url = %url,
                    timeout_secs = config.connect_timeout_secs,
                    "Redis connection timed out"
                );
                InfrastructureError::Connection(format!(
                    "no connection to {} within {}s",
                    url, config.connect_timeout_secs
                ))
            })??;

        info!(url = %url, entry_ttl_secs = config.ttl_secs, "Redis store ready");
        Ok(Self {
            connection,
            entry_ttl_secs: config.ttl_secs,
            retry,
        })
    }

    async fn connect(
        client: &Client,
        retry: RetryPolicy,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempt = 1;
        loop {
            debug!(attempt, "Opening Redis connection");
            match client.get_multiplexed_async_connection().await {
                Ok(connection) => return Ok(connection),
                Err(e) if attempt < retry.attempts => {
                    let pause = retry.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts = retry.attempts,
                        retry_in_ms = pause.as_millis() as u64,
                        error = %e,
                        "Redis connection failed"
                    );
                    sleep(pause).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempts = attempt, error = %e, "Giving up on Redis connection");
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// PING the server; `Ok(false)` on an unexpected reply
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let reply = self
            .run("ping", |mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await?;

        if reply != "PONG" {
            warn!(reply = %reply, "Unexpected Redis health check reply");
        }
        Ok(reply == "PONG")
    }

    /// Run `command`, retrying transient failures
    async fn run<F, T>(&self, op: &'static str, command: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempt = 1;
        loop {
            match command(self.connection.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry.attempts && is_retriable_error(&e) => {
                    let pause = self.retry.backoff(attempt);
                    warn!(
                        op,
                        attempt,
                        retry_in_ms = pause.as_millis() as u64,
                        error = %e,
                        "Redis command failed"
                    );
                    sleep(pause).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(op, attempts = attempt, error = %e, "Redis command gave up");
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl ExpiringStore for RedisClient {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.run("get", move |mut conn| {
            let key = key.clone();
            Box::pin(async move { conn.get::<_, Option<Vec<u8>>>(key).await })
        })
        .await
        .map_err(backend_error)
    }

    async fn get_with_info(&self, key: &str) -> StoreResult<Option<StoreEntry>> {
        Ok(self.get(key).await?.map(|value| StoreEntry {
            value,
            expired: false,
        }))
    }

    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_vec();
        let ttl = self.entry_ttl_secs;
        self.run("set", move |mut conn| {
            let key = key.clone();
            let value = value.clone();
            Box::pin(async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("EX")
                    .arg(ttl)
                    .query_async::<_, ()>(&mut conn)
                    .await
            })
        })
        .await
        .map_err(backend_error)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        self.run("del", move |mut conn| {
            let key = key.clone();
            Box::pin(async move { conn.del::<_, u32>(key).await })
        })
        .await
        .map(|removed| removed > 0)
        .map_err(backend_error)
    }
}

fn backend_error(error: RedisError) -> StoreError {
    StoreError::Backend(error.to_string())
}

/// Whether a failed command may succeed if sent again
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    error.is_io_error()
        || matches!(
            error.kind(),
            ErrorKind::BusyLoadingError | ErrorKind::TryAgain | ErrorKind::ClusterDown
        )
}

/// Hide credentials in a Redis URL before logging it
pub(crate) fn mask_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}****{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
