//! Configuration module with business-specific sub-modules
//!
//! - `cache` - Store backend selection, Redis and in-memory settings
//! - `environment` - Deployment environment detection
//! - `verification` - Cooldown, attempts and locking policy of the code cache

pub mod cache;
pub mod environment;
pub mod verification;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::{CacheConfig, CacheStrategyConfig, CacheType, MemoryCacheConfig};
pub use environment::Environment;
pub use crate::logging::{LogFormat, LoggingConfig};
pub use verification::VerificationCodeConfig;

/// Prefix of environment variables overriding file configuration
pub const ENV_PREFIX: &str = "VCODE";

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Store configuration
    pub cache: CacheStrategyConfig,

    /// Verification code policy
    pub verification: VerificationCodeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::from_env();
        Self {
            environment: env,
            logging: LoggingConfig::for_environment(env),
            cache: CacheStrategyConfig::default(),
            verification: VerificationCodeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Sources, lowest precedence first:
    /// 1. Built-in defaults
    /// 2. `path` (any format supported by `config`), if it exists
    /// 3. `VCODE__SECTION__KEY` environment variables, after loading `.env`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file named after the detected environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = Environment::from_env();
        Self::load(Some(&env.config_file()))
    }

    /// Reject configurations the verification cache cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let verification = &self.verification;
        if verification.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "verification.max_attempts must be at least 1".to_string(),
            ));
        }
        if verification.lock_stripes == 0 {
            return Err(ConfigError::Invalid(
                "verification.lock_stripes must be at least 1".to_string(),
            ));
        }
        if verification.key_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "verification.key_prefix must not be empty".to_string(),
            ));
        }

        let ttl = self.cache.entry_ttl_secs();
        if ttl <= verification.cooldown_secs {
            return Err(ConfigError::Invalid(format!(
                "cache entry ttl ({}s) must exceed the cooldown window ({}s)",
                ttl, verification.cooldown_secs
            )));
        }
        Ok(())
    }
}
