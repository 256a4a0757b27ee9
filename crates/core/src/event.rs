//! Parsed server events.
//!
//! These are the outputs of the three external parsing pipelines (console
//! replies, telemetry replies and the server event log). Parsing itself lives
//! outside this workspace; the commander only routes the parsed values.

use serde::{Deserialize, Serialize};

/// Identifies the mission a log event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionInfo {
    /// Mission file as reported by the server
    pub token: String,
}

/// Map position reported by the telemetry link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Replies parsed from the console link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleReply {
    /// A pilot joined the server.
    PilotJoined {
        callsign: String,
        channel: u32,
        address: String,
    },
    /// A pilot left the server.
    PilotLeft { callsign: String },
    /// A chat line typed by a pilot.
    Chat { callsign: String, text: String },
}

/// Replies parsed from the telemetry link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryReply {
    PilotPosition { callsign: String, position: Position },
    ObjectPosition { name: String, position: Position },
}

/// Events parsed from the server event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerLogEvent {
    MissionBegan(MissionInfo),
    MissionEnded(MissionInfo),
    PilotSpawned { callsign: String, aircraft: String },
    PilotKilled { callsign: String },
    ObjectDestroyed { name: String },
}
