//! Error types for the commander.

use minic_catalog::CatalogError;
use minic_core::ConfigError;
use minic_playback::PlaybackError;
use minic_supervisor::SupervisorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommanderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Connection error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// The commander event loop is no longer running
    #[error("Commander has shut down")]
    Shutdown,
}

/// Result type for commander operations.
pub type CommanderResult<T> = Result<T, CommanderError>;
