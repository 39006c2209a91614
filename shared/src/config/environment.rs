//! Deployment environment detection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Variables consulted, in order, to detect the environment
const ENVIRONMENT_VARS: [&str; 2] = ["VCODE_ENV", "APP_ENV"];

/// Where the process is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Detect the environment from `VCODE_ENV` or `APP_ENV`
    ///
    /// Unset or unrecognized values fall back to development.
    pub fn from_env() -> Self {
        ENVIRONMENT_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Configuration file for this environment, extension left to `config`
    pub fn config_file(self) -> String {
        format!("config/{}", self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment `{}`", other)),
        }
    }
}
