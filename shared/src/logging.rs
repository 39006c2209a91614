//! Tracing subscriber bootstrap and its configuration

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Environment;

/// Output format of log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Subscriber settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Emit ANSI colors
    pub ansi: bool,
    /// Attach file and line to every event
    pub with_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl LoggingConfig {
    /// Human-readable output locally, JSON once deployed
    pub fn for_environment(env: Environment) -> Self {
        let local = env == Environment::Development;
        Self {
            level: if local { "debug" } else { "info" }.to_string(),
            format: if local { LogFormat::Pretty } else { LogFormat::Json },
            ansi: local,
            with_location: local,
        }
    }
}

/// Install the global tracing subscriber described by `config`
///
/// `RUST_LOG`, when set, takes precedence over `config.level`. Calling this
/// more than once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_file(config.with_location)
        .with_line_number(config.with_location);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
