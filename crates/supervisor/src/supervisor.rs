//! Lifecycle of the telemetry and console links.
//!
//! `Disconnected --start--> Connecting --telemetry ready--> (console connect)
//! --handshake--> Connected`. A dropped console link goes back to
//! `Connecting` while the connector retries; `stop` always ends in
//! `Disconnected`.
//!
//! The supervisor does not run its own task. The owner polls
//! [`ConnectionSupervisor::recv_signal`] from its event loop and feeds each
//! signal back through [`ConnectionSupervisor::handle_signal`], which keeps all
//! state changes on the owner's execution context.

use crate::client::{
    ConsoleClient, ConsoleConnector, ConsoleLinkEvent, ConsoleSession, LinkEventSender,
    LinkSignal, LinkSignalKind, TelemetryClient,
};
use crate::error::{SupervisorError, SupervisorResult};
use minic_core::{ConfigError, ServerSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Transition reported by [`ConnectionSupervisor::handle_signal`] and
/// [`ConnectionSupervisor::stop`].
#[derive(Clone)]
pub enum SupervisorEvent {
    /// Console handshake succeeded. `after_loss` is set when the previous
    /// console connection dropped unexpectedly.
    Connected {
        client: Arc<dyn ConsoleClient>,
        after_loss: bool,
    },
    ConnectFailed(String),
    /// Graceful close or explicit stop
    Disconnected,
    ConnectionLost(String),
}

impl fmt::Debug for SupervisorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { after_loss, .. } => f
                .debug_struct("Connected")
                .field("after_loss", after_loss)
                .finish(),
            Self::ConnectFailed(reason) => f.debug_tuple("ConnectFailed").field(reason).finish(),
            Self::Disconnected => f.write_str("Disconnected"),
            Self::ConnectionLost(reason) => f.debug_tuple("ConnectionLost").field(reason).finish(),
        }
    }
}

/// Client-free view of a [`SupervisorEvent`] for subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "reason", rename_all = "snake_case")]
pub enum ConnectionEvent {
    Connected,
    ConnectFailed(String),
    Disconnected,
    ConnectionLost(String),
}

impl From<&SupervisorEvent> for ConnectionEvent {
    fn from(event: &SupervisorEvent) -> Self {
        match event {
            SupervisorEvent::Connected { .. } => Self::Connected,
            SupervisorEvent::ConnectFailed(reason) => Self::ConnectFailed(reason.clone()),
            SupervisorEvent::Disconnected => Self::Disconnected,
            SupervisorEvent::ConnectionLost(reason) => Self::ConnectionLost(reason.clone()),
        }
    }
}

pub struct ConnectionSupervisor {
    telemetry: Arc<dyn TelemetryClient>,
    connector: Arc<dyn ConsoleConnector>,
    settings: Option<ServerSettings>,
    state: ConnectionState,
    /// Bumped on every start and stop; signals from older cycles are dropped.
    epoch: u64,
    signal_tx: mpsc::UnboundedSender<LinkSignal>,
    signal_rx: mpsc::UnboundedReceiver<LinkSignal>,
    telemetry_task: Option<JoinHandle<()>>,
    session: Option<Box<dyn ConsoleSession>>,
    console: Option<Arc<dyn ConsoleClient>>,
    connection_was_lost: bool,
}

impl ConnectionSupervisor {
    pub fn new(
        telemetry: Arc<dyn TelemetryClient>,
        connector: Arc<dyn ConsoleConnector>,
        settings: Option<ServerSettings>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            telemetry,
            connector,
            settings,
            state: ConnectionState::Disconnected,
            epoch: 0,
            signal_tx,
            signal_rx,
            telemetry_task: None,
            session: None,
            console: None,
            connection_was_lost: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Console client of the current connection.
    pub fn console(&self) -> Option<Arc<dyn ConsoleClient>> {
        self.console.clone()
    }

    pub fn settings(&self) -> Option<&ServerSettings> {
        self.settings.as_ref()
    }

    /// Replace the connection parameters; applies from the next `start`.
    pub fn set_settings(&mut self, settings: Option<ServerSettings>) {
        self.settings = settings;
    }

    /// Whether the last console connection ended by an unexpected drop.
    pub fn connection_was_lost(&self) -> bool {
        self.connection_was_lost
    }

    /// Bring the links up: telemetry first, console once telemetry is ready.
    pub fn start(&mut self) -> SupervisorResult<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(SupervisorError::AlreadyStarted { state: self.state });
        }
        let settings = self
            .settings
            .clone()
            .ok_or(ConfigError::ServerSettingsMissing)?;

        self.epoch += 1;
        self.state = ConnectionState::Connecting;
        self.connection_was_lost = false;
        info!(
            console = %settings.console,
            telemetry = %settings.telemetry,
            epoch = self.epoch,
            "Starting server links"
        );

        let telemetry = Arc::clone(&self.telemetry);
        let tx = self.signal_tx.clone();
        let epoch = self.epoch;
        let endpoint = settings.telemetry;
        self.telemetry_task = Some(tokio::spawn(async move {
            let kind = match telemetry.listen(&endpoint).await {
                Ok(()) => LinkSignalKind::TelemetryReady,
                Err(e) => LinkSignalKind::TelemetryFailed(e.to_string()),
            };
            let _ = tx.send(LinkSignal { epoch, kind });
        }));
        Ok(())
    }

    /// Next link signal. Cancel safe, so it can sit in a `select!` loop.
    pub async fn recv_signal(&mut self) -> LinkSignal {
        match self.signal_rx.recv().await {
            Some(signal) => signal,
            // The supervisor holds a sender, so the channel never closes
            None => std::future::pending().await,
        }
    }

    /// Apply a link signal and report the resulting transition, if any.
    pub fn handle_signal(&mut self, signal: LinkSignal) -> Option<SupervisorEvent> {
        if signal.epoch != self.epoch || self.state == ConnectionState::Disconnected {
            debug!(
                signal_epoch = signal.epoch,
                epoch = self.epoch,
                "Dropping stale link signal"
            );
            return None;
        }

        match signal.kind {
            LinkSignalKind::TelemetryReady => {
                self.telemetry_task = None;
                let settings = self.settings.as_ref()?;
                info!(console = %settings.console, "Telemetry link ready, connecting console");
                let events = LinkEventSender::new(self.epoch, self.signal_tx.clone());
                self.session = Some(self.connector.connect(&settings.console, events));
                None
            }
            LinkSignalKind::TelemetryFailed(reason) => {
                warn!(reason = %reason, "Telemetry link failed to start");
                self.telemetry_task = None;
                self.session = None;
                self.console = None;
                self.state = ConnectionState::Disconnected;
                Some(SupervisorEvent::ConnectFailed(reason))
            }
            LinkSignalKind::Console(event) => self.handle_console_event(event),
        }
    }

    fn handle_console_event(&mut self, event: ConsoleLinkEvent) -> Option<SupervisorEvent> {
        match event {
            ConsoleLinkEvent::Established(client) => {
                let after_loss = self.connection_was_lost;
                self.connection_was_lost = false;
                self.console = Some(Arc::clone(&client));
                self.state = ConnectionState::Connected;
                info!(after_loss, "Console connection established");
                Some(SupervisorEvent::Connected { client, after_loss })
            }
            ConsoleLinkEvent::AttemptFailed(reason) => {
                warn!(reason = %reason, "Console connection attempt failed");
                Some(SupervisorEvent::ConnectFailed(reason))
            }
            ConsoleLinkEvent::Closed => {
                if self.state != ConnectionState::Connected {
                    return None;
                }
                info!("Console connection closed, waiting for reconnect");
                self.console = None;
                self.connection_was_lost = false;
                self.state = ConnectionState::Connecting;
                Some(SupervisorEvent::Disconnected)
            }
            ConsoleLinkEvent::Lost(reason) => {
                if self.state != ConnectionState::Connected {
                    return None;
                }
                warn!(reason = %reason, "Console connection lost, waiting for reconnect");
                self.console = None;
                self.connection_was_lost = true;
                self.state = ConnectionState::Connecting;
                Some(SupervisorEvent::ConnectionLost(reason))
            }
        }
    }

    /// Tear both links down. Returns once telemetry has stopped and the
    /// console session is cancelled and closed; `None` when already stopped.
    pub async fn stop(&mut self) -> Option<SupervisorEvent> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        self.epoch += 1;
        info!(state = ?self.state, "Stopping server links");

        if let Some(task) = self.telemetry_task.take() {
            task.abort();
        }
        self.telemetry.stop_listening().await;

        if let Some(mut session) = self.session.take() {
            session.stop_trying();
            session.disconnect().await;
        }

        self.console = None;
        self.connection_was_lost = false;
        self.state = ConnectionState::Disconnected;
        debug!("Server links stopped");
        Some(SupervisorEvent::Disconnected)
    }
}
