//! Structured logging setup for the commander.
//!
//! `RUST_LOG` always wins; otherwise the level from [`LoggingConfig`] is used.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize human-readable logging at `level`.
///
/// # Example
/// ```no_run
/// use minic_core::logging;
///
/// logging::init("info");
/// tracing::info!("Commander started");
/// ```
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(fmt::layer().with_target(true))
        .init();
}

/// Initialize JSON logging at `level`, for log aggregation.
pub fn init_json(level: &str) {
    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(fmt::layer().json().with_target(true))
        .init();
}

/// Initialize logging as described by the `[logging]` config section.
pub fn init_from_config(config: &LoggingConfig) {
    if config.json {
        init_json(&config.level);
    } else {
        init(&config.level);
    }
}
