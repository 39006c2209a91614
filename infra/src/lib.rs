//! # Infrastructure Layer
//!
//! Concrete stores for the verification code cache and the wiring that builds
//! a ready-to-use cache from configuration.
//!
//! ## Architecture
//!
//! - **Cache**: bounded in-memory store (moka) and Redis client
//! - **Bootstrap**: [`initialize`] loads configuration, installs logging and
//!   builds the cache
//!
//! ## Features
//!
//! - `redis-cache`: Enable Redis store support (default)

// Re-export core types for convenience
pub use vc_core::errors::*;

/// Cache module - store backends and cache construction
pub mod cache;

use vc_shared::config::{AppConfig, ConfigError};

pub use cache::{build_verification_cache, VerificationCache};

/// Initialize the verification cache with async runtime
///
/// This function:
/// - Loads configuration from `config_path` and `VCODE__*` variables
/// - Installs the tracing subscriber
/// - Connects the configured store
pub async fn initialize(config_path: Option<&str>) -> Result<VerificationCache, InfrastructureError> {
    let config = AppConfig::load(config_path)?;
    vc_shared::init_logging(&config.logging);

    tracing::info!(
        environment = %config.environment,
        "Initializing verification cache..."
    );

    let cache = build_verification_cache(&config).await?;

    tracing::info!("Verification cache initialized successfully");
    Ok(cache)
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[cfg(feature = "redis-cache")]
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Store operation error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Could not reach a backend in time
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration failed to load or validate
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}
