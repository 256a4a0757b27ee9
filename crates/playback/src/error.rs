//! Error types for playback commands.
//!
//! Only command preconditions are errors. Failures of the console requests
//! themselves become state transitions plus a [`PlaybackEvent::Failed`].
//!
//! [`PlaybackEvent::Failed`]: crate::PlaybackEvent::Failed

use crate::state::PlaybackState;
use minic_catalog::MissionId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// No console connection to send commands through
    #[error("Console is not connected")]
    NotConnected,

    /// Another playback operation is in progress
    #[error("Playback is busy ({state})")]
    Busy { state: PlaybackState },

    /// Catalog has no current mission
    #[error("Current mission is not set")]
    NoCurrentMission,

    #[error("Mission {id} has no mission file")]
    MissionFileUnset { id: MissionId },
}

/// Result type for playback commands.
pub type PlaybackResult<T> = Result<T, PlaybackError>;
