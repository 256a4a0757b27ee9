//! Supervision of the two game server links.
//!
//! The telemetry link comes up first; once it is ready the reconnecting
//! console link is opened. [`ConnectionSupervisor`] turns the outcomes
//! reported by the external clients into [`SupervisorEvent`]s for its owner.

pub mod client;
pub mod error;
pub mod supervisor;

pub use client::{
    ConsoleClient, ConsoleConnector, ConsoleLinkEvent, ConsoleSession, LinkEventSender,
    LinkSignal, TelemetryClient,
};
pub use error::{ClientError, SupervisorError, SupervisorResult};
pub use supervisor::{ConnectionEvent, ConnectionState, ConnectionSupervisor, SupervisorEvent};
