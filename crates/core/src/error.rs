//! Core error types

use thiserror::Error;

/// Configuration errors.
///
/// Fatal to a connect attempt: surfaced to the operator and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Config file could not be read
    #[error("Failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),

    /// Config file is not valid TOML for the expected shape
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Server connection parameters were never loaded
    #[error("Server connection settings are not loaded")]
    ServerSettingsMissing,

    /// A field failed validation
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
