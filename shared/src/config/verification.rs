//! Verification code policy configuration

use serde::{Deserialize, Serialize};

/// Policy applied by the verification code cache
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerificationCodeConfig {
    /// Prefix of every key written to the store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Minimum seconds between two codes issued for the same recipient
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Verification attempts granted to each issued code
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Number of lock stripes; 1 serializes every operation
    #[serde(default = "default_lock_stripes")]
    pub lock_stripes: usize,
}

impl Default for VerificationCodeConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            cooldown_secs: default_cooldown_secs(),
            max_attempts: default_max_attempts(),
            lock_stripes: default_lock_stripes(),
        }
    }
}

impl VerificationCodeConfig {
    /// Shard the lock across `stripes` mutexes
    pub fn with_lock_stripes(mut self, stripes: usize) -> Self {
        self.lock_stripes = stripes;
        self
    }

    /// Override the cooldown window
    pub fn with_cooldown_secs(mut self, seconds: u64) -> Self {
        self.cooldown_secs = seconds;
        self
    }
}

fn default_key_prefix() -> String {
    String::from("phone_code")
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lock_stripes() -> usize {
    1
}
