//! # Observability
//!
//! Structured logging via `tracing`. `RUST_LOG` wins over the configured level so
//! operators can raise verbosity per module without touching configuration.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global fmt subscriber.
///
/// Idempotent: if a subscriber is already installed (a second call, or a test
/// harness) the existing one is kept. Returns whether this call installed it.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().flatten_event(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    }
    installed
}
