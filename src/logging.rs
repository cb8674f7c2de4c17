//! Structured logging setup.
//!
//! Installs a `tracing` subscriber with an environment filter and a console
//! formatter, compact or JSON. `RUST_LOG` takes precedence over the configured level.

use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

use crate::error::{Result, SioError};

fn default_level() -> String {
    "info".to_string()
}

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter, in `EnvFilter` directive syntax.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Build the filter, letting `RUST_LOG` override the configured level.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level).map_err(|e| {
                SioError::Config(format!("invalid log level {:?}: {}", self.level, e))
            }),
        }
    }
}

/// Install the global subscriber.
///
/// Fails if the level is invalid or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let subscriber = Registry::default().with(config.env_filter()?);

    let installed = if config.json {
        subscriber
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init()
    } else {
        subscriber
            .with(fmt::layer().compact().with_target(true).with_thread_ids(true))
            .try_init()
    };
    installed.map_err(|e| SioError::Config(format!("failed to install logger: {}", e)))?;

    info!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}
