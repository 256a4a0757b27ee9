//! Collaborator contracts for the two server links.
//!
//! The wire protocols live outside this workspace. The supervisor and the
//! scheduler only talk to these traits, which keeps them testable with
//! scripted doubles.

use crate::error::ClientError;
use async_trait::async_trait;
use minic_core::Endpoint;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Command side of an established console connection.
#[async_trait]
pub trait ConsoleClient: Send + Sync {
    /// Load a mission file, path relative to the server missions directory.
    async fn load_mission(&self, path: &str) -> Result<(), ClientError>;

    /// Begin the loaded mission.
    async fn begin_mission(&self) -> Result<(), ClientError>;

    /// End and unload the running mission.
    async fn destroy_mission(&self) -> Result<(), ClientError>;

    /// Broadcast a chat line to every pilot. Fire and forget.
    fn send_chat_to_all(&self, text: &str);
}

/// Datagram link used for auxiliary server queries.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// Bind the local listener; resolves once the link is ready.
    async fn listen(&self, endpoint: &Endpoint) -> Result<(), ClientError>;

    async fn stop_listening(&self);
}

/// Opens the reconnecting console link.
///
/// The connector owns the retry policy. It reports every outcome through the
/// [`LinkEventSender`] it was given, for as long as the session lives, so the
/// supervisor subscribes once per session instead of once per attempt.
pub trait ConsoleConnector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint, events: LinkEventSender) -> Box<dyn ConsoleSession>;
}

/// Handle to a running console connect/retry loop.
#[async_trait]
pub trait ConsoleSession: Send {
    /// Cancel any pending or future reconnect attempt.
    fn stop_trying(&mut self);

    /// Close the established connection, if any.
    async fn disconnect(&mut self);
}

/// Outcome of the console link reported by a [`ConsoleConnector`].
#[derive(Clone)]
pub enum ConsoleLinkEvent {
    /// Handshake completed
    Established(Arc<dyn ConsoleClient>),
    /// A single attempt failed; the connector may retry
    AttemptFailed(String),
    /// Connection closed cleanly
    Closed,
    /// Connection dropped unexpectedly
    Lost(String),
}

impl fmt::Debug for ConsoleLinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Established(_) => f.write_str("Established"),
            Self::AttemptFailed(reason) => f.debug_tuple("AttemptFailed").field(reason).finish(),
            Self::Closed => f.write_str("Closed"),
            Self::Lost(reason) => f.debug_tuple("Lost").field(reason).finish(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum LinkSignalKind {
    TelemetryReady,
    TelemetryFailed(String),
    Console(ConsoleLinkEvent),
}

/// A link outcome tagged with the start cycle that produced it.
#[derive(Debug)]
pub struct LinkSignal {
    pub(crate) epoch: u64,
    pub(crate) kind: LinkSignalKind,
}

/// Sender side of the persistent console link subscription.
#[derive(Clone)]
pub struct LinkEventSender {
    epoch: u64,
    tx: mpsc::UnboundedSender<LinkSignal>,
}

impl LinkEventSender {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<LinkSignal>) -> Self {
        Self { epoch, tx }
    }

    /// Report a link outcome. Returns `false` once the supervisor is gone.
    pub fn send(&self, event: ConsoleLinkEvent) -> bool {
        self.tx
            .send(LinkSignal {
                epoch: self.epoch,
                kind: LinkSignalKind::Console(event),
            })
            .is_ok()
    }
}

impl fmt::Debug for LinkEventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkEventSender")
            .field("epoch", &self.epoch)
            .finish()
    }
}
