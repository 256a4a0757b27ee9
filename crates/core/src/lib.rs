//! Core functionality shared by the minic commander crates.
//!
//! This crate provides the typed application configuration, the error type for
//! configuration problems, logging initialisation and the parsed server events
//! exchanged between the external parsers and the commander.

pub mod config;
pub mod error;
pub mod event;
pub mod logging;

pub use config::{
    default_catalog_path, default_config_path, AppConfig, CatalogConfig, Endpoint, LoggingConfig,
    ServerConfig, ServerSettings, TelemetryConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use event::{ConsoleReply, MissionInfo, Position, ServerLogEvent, TelemetryReply};
