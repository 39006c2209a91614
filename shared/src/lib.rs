//! Shared utilities and common types for the verification code cache
//!
//! This crate provides common functionality used across all workspace crates:
//! - Configuration types and layered loading
//! - Logging bootstrap
//! - Recipient masking for log output

pub mod config;
pub mod logging;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, CacheStrategyConfig, CacheType, ConfigError, Environment,
    LoggingConfig, MemoryCacheConfig, VerificationCodeConfig,
};
pub use logging::init_logging;
pub use utils::phone;
