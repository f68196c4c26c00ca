//! Logging setup for binaries
//!
//! `RUST_LOG` overrides the configured level when present.

use crate::receiver_config::LoggingConfig;
use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to `config.level`
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level directive {:?}", config.level)),
    }
}

/// Install the global subscriber; fails if one is already set
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_thread_names(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_thread_names(true))
            .try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
