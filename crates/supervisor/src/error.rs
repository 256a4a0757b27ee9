//! Error types for the server links.

use crate::supervisor::ConnectionState;
use minic_core::ConfigError;
use thiserror::Error;

/// Failure reported by a console or telemetry collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server rejected or failed the request
    #[error("Request failed: {0}")]
    Request(String),

    /// The link went away while the request was in flight
    #[error("Connection closed")]
    Closed,

    /// No reply arrived in time
    #[error("Request timed out")]
    Timeout,
}

/// Errors returned by [`ConnectionSupervisor`](crate::ConnectionSupervisor).
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Server connection parameters are missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// `start` was called while the links are already up or coming up
    #[error("Supervisor already started ({state:?})")]
    AlreadyStarted { state: ConnectionState },
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
