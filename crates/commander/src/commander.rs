//! The commander event loop.
//!
//! [`Commander`] owns the catalog, the connection supervisor and the router.
//! A single task selects over operator commands, link signals, parsed server
//! events and the scheduler's completions and countdown, handling each to
//! completion before taking the next. Nothing else mutates this state.

use crate::error::{CommanderError, CommanderResult};
use crate::router::CommandRouter;
use minic_catalog::{
    CatalogResult, CatalogStore, Mission, MissionCatalog, MissionDraft, MissionId, MissionUpdate,
};
use minic_core::{ConsoleReply, ServerLogEvent, TelemetryReply};
use minic_playback::{PlaybackEvent, PlaybackState, PlaybackStatus};
use minic_supervisor::{ConnectionEvent, ConnectionState, ConnectionSupervisor, SupervisorEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMMAND_CAPACITY: usize = 64;
const EVENT_PIPE_CAPACITY: usize = 1024;
const CONNECTION_EVENT_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<CommanderResult<T>>;

enum Command {
    Connect(Reply<()>),
    Disconnect(oneshot::Sender<()>),
    Missions(oneshot::Sender<CatalogSnapshot>),
    AddMission(MissionDraft, Reply<MissionId>),
    RemoveMission(MissionId, Reply<Mission>),
    MoveMission {
        id: MissionId,
        index: usize,
        reply: Reply<()>,
    },
    UpdateMission {
        id: MissionId,
        update: MissionUpdate,
        reply: Reply<Mission>,
    },
    SelectMission(Option<MissionId>, Reply<()>),
    RunMission(Reply<()>),
    StopMission(Reply<()>),
    RestartMission(Reply<()>),
    Status(oneshot::Sender<CommanderStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Catalog contents in rotation order plus the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub missions: Vec<Mission>,
    pub current_id: Option<MissionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommanderStatus {
    pub connection: ConnectionState,
    pub playback: PlaybackStatus,
    pub current_id: Option<MissionId>,
    pub pilots_online: usize,
}

/// Inputs for the external parsers of console replies, telemetry replies and
/// the server event log.
#[derive(Debug, Clone)]
pub struct EventPipes {
    pub console: mpsc::Sender<ConsoleReply>,
    pub telemetry: mpsc::Sender<TelemetryReply>,
    pub log: mpsc::Sender<ServerLogEvent>,
}

/// Cloneable command surface of a running [`Commander`].
#[derive(Clone)]
pub struct CommanderHandle {
    commands: mpsc::Sender<Command>,
    playback: broadcast::Sender<PlaybackEvent>,
    connection: broadcast::Sender<ConnectionEvent>,
}

impl CommanderHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> CommanderResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| CommanderError::Shutdown)?;
        rx.await.map_err(|_| CommanderError::Shutdown)
    }

    /// Bring the server links up. Returns once the attempt has started; watch
    /// [`CommanderHandle::subscribe_connection`] for the outcome.
    pub async fn connect(&self) -> CommanderResult<()> {
        self.request(Command::Connect).await?
    }

    /// Stop the services, then both server links.
    pub async fn disconnect(&self) -> CommanderResult<()> {
        self.request(Command::Disconnect).await
    }

    pub async fn missions(&self) -> CommanderResult<CatalogSnapshot> {
        self.request(Command::Missions).await
    }

    pub async fn add_mission(&self, draft: MissionDraft) -> CommanderResult<MissionId> {
        self.request(|reply| Command::AddMission(draft, reply)).await?
    }

    pub async fn remove_mission(&self, id: MissionId) -> CommanderResult<Mission> {
        self.request(|reply| Command::RemoveMission(id, reply)).await?
    }

    pub async fn move_mission(&self, id: MissionId, index: usize) -> CommanderResult<()> {
        self.request(|reply| Command::MoveMission { id, index, reply })
            .await?
    }

    pub async fn update_mission(
        &self,
        id: MissionId,
        update: MissionUpdate,
    ) -> CommanderResult<Mission> {
        self.request(|reply| Command::UpdateMission { id, update, reply })
            .await?
    }

    /// Select a mission, or clear the selection. Selecting another mission
    /// while one is playing restarts playback with the new selection.
    pub async fn select_mission(&self, id: Option<MissionId>) -> CommanderResult<()> {
        self.request(|reply| Command::SelectMission(id, reply))
            .await?
    }

    pub async fn run_mission(&self) -> CommanderResult<()> {
        self.request(Command::RunMission).await?
    }

    pub async fn stop_mission(&self) -> CommanderResult<()> {
        self.request(Command::StopMission).await?
    }

    pub async fn restart_mission(&self) -> CommanderResult<()> {
        self.request(Command::RestartMission).await?
    }

    pub async fn status(&self) -> CommanderResult<CommanderStatus> {
        self.request(Command::Status).await
    }

    /// Disconnect and end the event loop.
    pub async fn shutdown(&self) -> CommanderResult<()> {
        self.request(Command::Shutdown).await
    }

    pub fn subscribe_playback(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.playback.subscribe()
    }

    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection.subscribe()
    }
}

pub struct Commander {
    catalog: MissionCatalog,
    store: CatalogStore,
    supervisor: ConnectionSupervisor,
    router: CommandRouter,
    commands: mpsc::Receiver<Command>,
    console_replies: mpsc::Receiver<ConsoleReply>,
    telemetry_replies: mpsc::Receiver<TelemetryReply>,
    log_events: mpsc::Receiver<ServerLogEvent>,
    connection_events: broadcast::Sender<ConnectionEvent>,
}

impl Commander {
    /// Build a commander around `supervisor`, loading the catalog from
    /// `store`. A store that cannot be read leaves the catalog empty.
    pub fn new(
        store: CatalogStore,
        supervisor: ConnectionSupervisor,
    ) -> (Self, CommanderHandle, EventPipes) {
        let catalog = match store.load() {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(path = %store.path().display(), error = %e, "Failed to load catalog, starting empty");
                MissionCatalog::new()
            }
        };
        info!(missions = catalog.len(), current_id = ?catalog.current_id(), "Catalog ready");

        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (console_tx, console_replies) = mpsc::channel(EVENT_PIPE_CAPACITY);
        let (telemetry_tx, telemetry_replies) = mpsc::channel(EVENT_PIPE_CAPACITY);
        let (log_tx, log_events) = mpsc::channel(EVENT_PIPE_CAPACITY);
        let (connection_events, _) = broadcast::channel(CONNECTION_EVENT_CAPACITY);
        let router = CommandRouter::new();

        let handle = CommanderHandle {
            commands: command_tx,
            playback: router.scheduler().events(),
            connection: connection_events.clone(),
        };
        let pipes = EventPipes {
            console: console_tx,
            telemetry: telemetry_tx,
            log: log_tx,
        };
        let commander = Self {
            catalog,
            store,
            supervisor,
            router,
            commands,
            console_replies,
            telemetry_replies,
            log_events,
            connection_events,
        };
        (commander, handle, pipes)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the event loop until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Commander started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.disconnect().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.disconnect().await;
                        break;
                    }
                },
                signal = self.supervisor.recv_signal() => {
                    if let Some(event) = self.supervisor.handle_signal(signal) {
                        self.on_supervisor_event(event);
                    }
                }
                wake = self.router.scheduler_mut().next_wake() => {
                    if let Some(id) = self.router.scheduler_mut().handle_wake(wake, &mut self.catalog) {
                        debug!(mission_id = %id, "Rotation advanced selection");
                        self.persist_logged();
                    }
                }
                Some(reply) = self.console_replies.recv() => self.router.on_console_reply(&reply),
                Some(reply) = self.telemetry_replies.recv() => self.router.on_telemetry_reply(&reply),
                Some(event) = self.log_events.recv() => self.router.on_log_event(&event),
            }
        }
        info!("Commander stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => {
                let _ = reply.send(self.supervisor.start().map_err(CommanderError::from));
            }
            Command::Disconnect(reply) => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Missions(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::AddMission(draft, reply) => {
                let _ = reply.send(self.add_mission(draft));
            }
            Command::RemoveMission(id, reply) => {
                let _ = reply.send(self.remove_mission(id));
            }
            Command::MoveMission { id, index, reply } => {
                let _ = reply.send(self.move_mission(id, index));
            }
            Command::UpdateMission { id, update, reply } => {
                let _ = reply.send(self.update_mission(id, update));
            }
            Command::SelectMission(id, reply) => {
                let _ = reply.send(self.select_mission(id));
            }
            Command::RunMission(reply) => {
                let result = self.router.scheduler_mut().run(&self.catalog);
                let _ = reply.send(result.map_err(CommanderError::from));
            }
            Command::StopMission(reply) => {
                let result = self.router.scheduler_mut().stop();
                let _ = reply.send(result.map_err(CommanderError::from));
            }
            Command::RestartMission(reply) => {
                let result = self.router.scheduler_mut().restart(&self.catalog);
                let _ = reply.send(result.map_err(CommanderError::from));
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            // Handled by the loop
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn on_supervisor_event(&mut self, event: SupervisorEvent) {
        match &event {
            SupervisorEvent::Connected { client, after_loss } => {
                match self.supervisor.settings() {
                    Some(settings) => self.router.start(
                        client.clone(),
                        *after_loss,
                        settings,
                        &self.catalog,
                    ),
                    None => warn!("Connected without server settings, services not started"),
                }
            }
            SupervisorEvent::Disconnected | SupervisorEvent::ConnectionLost(_) => {
                self.router.stop(false);
            }
            SupervisorEvent::ConnectFailed(reason) => {
                warn!(reason = %reason, "Connection attempt failed");
            }
        }
        self.publish(&event);
    }

    /// Router first, then telemetry and console.
    async fn disconnect(&mut self) {
        self.router.stop(self.supervisor.is_connected());
        if let Some(event) = self.supervisor.stop().await {
            self.publish(&event);
        }
    }

    fn publish(&self, event: &SupervisorEvent) {
        let _ = self.connection_events.send(ConnectionEvent::from(event));
    }

    fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            missions: self.catalog.list().to_vec(),
            current_id: self.catalog.current_id(),
        }
    }

    fn status(&self) -> CommanderStatus {
        CommanderStatus {
            connection: self.supervisor.state(),
            playback: self.router.scheduler().status(),
            current_id: self.catalog.current_id(),
            pilots_online: self.router.pilots().count(),
        }
    }

    /// Saves a selection the scheduler advanced on its own. The rotation has
    /// already happened on the server, so a failed save is only logged.
    fn persist_logged(&self) {
        if let Err(e) = self.store.save(&self.catalog) {
            error!(path = %self.store.path().display(), error = %e, "Failed to persist catalog");
        }
    }

    /// Id of the mission currently on the server, when it is playing.
    fn live_mission(&self) -> Option<MissionId> {
        let scheduler = self.router.scheduler();
        if scheduler.state() != PlaybackState::Playing {
            return None;
        }
        scheduler.active_mission().map(|m| m.id)
    }

    fn restart_live(&mut self, reason: &str) {
        info!(reason, "Restarting live mission");
        if let Err(e) = self.router.scheduler_mut().restart(&self.catalog) {
            warn!(error = %e, "Failed to restart live mission");
        }
    }

    /// Applies a catalog edit to a copy and keeps it only once it is saved,
    /// so a failed save leaves the catalog as it was.
    fn edit<T>(
        &mut self,
        apply: impl FnOnce(&mut MissionCatalog) -> CatalogResult<T>,
    ) -> CommanderResult<T> {
        let mut edited = self.catalog.clone();
        let value = apply(&mut edited)?;
        self.store.save(&edited).map_err(|e| {
            error!(path = %self.store.path().display(), error = %e, "Failed to persist catalog, edit discarded");
            CommanderError::from(e)
        })?;
        self.catalog = edited;
        Ok(value)
    }

    fn add_mission(&mut self, draft: MissionDraft) -> CommanderResult<MissionId> {
        self.edit(|catalog| catalog.add(draft))
    }

    fn remove_mission(&mut self, id: MissionId) -> CommanderResult<Mission> {
        self.edit(|catalog| catalog.remove(id))
    }

    fn move_mission(&mut self, id: MissionId, index: usize) -> CommanderResult<()> {
        self.edit(|catalog| catalog.reorder(id, index))
    }

    fn update_mission(&mut self, id: MissionId, update: MissionUpdate) -> CommanderResult<Mission> {
        let affects_playback = update.affects_playback();
        let mission = self.edit(|catalog| catalog.update(id, update).cloned())?;

        if affects_playback && self.live_mission() == Some(id) {
            self.restart_live("live mission edited");
        }
        Ok(mission)
    }

    fn select_mission(&mut self, id: Option<MissionId>) -> CommanderResult<()> {
        self.edit(|catalog| catalog.set_current(id))?;

        if let (Some(live), Some(selected)) = (self.live_mission(), id) {
            if live != selected {
                self.restart_live("selection changed");
            }
        }
        Ok(())
    }
}
