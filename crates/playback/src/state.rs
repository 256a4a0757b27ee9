//! Playback states and the notifications published to observers.

use minic_catalog::{Mission, MissionId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Loading,
    Starting,
    Playing,
    Stopping,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Loading => "loading",
            Self::Starting => "starting",
            Self::Playing => "playing",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Step of a mission run a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStage {
    /// Resolving the mission before any console request, on runs the
    /// scheduler starts by itself (rotation, resume)
    Prepare,
    Load,
    Begin,
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    StateChanged { state: PlaybackState },
    TimerTick { seconds_remaining: u32 },
    Failed {
        mission: Option<MissionId>,
        stage: PlaybackStage,
        reason: String,
    },
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub active_mission: Option<Mission>,
    pub seconds_remaining: u32,
    pub time_left: String,
}

/// `HH:MM:SS` rendering of a countdown.
pub fn time_left_str(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
