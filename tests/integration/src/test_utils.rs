//! Scripted server links and a wired-up commander for end-to-end tests.

use async_trait::async_trait;
use minic_catalog::{CatalogStore, MissionCatalog, MissionDraft};
use minic_commander::{Commander, CommanderHandle, EventPipes};
use minic_core::{Endpoint, ServerSettings};
use minic_playback::{PlaybackEvent, PlaybackState};
use minic_supervisor::{
    ClientError, ConnectionEvent, ConnectionSupervisor, ConsoleClient, ConsoleConnector,
    ConsoleLinkEvent, ConsoleSession, LinkEventSender, TelemetryClient,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Upper bound for any wait. Tests run on paused time, so this is virtual.
pub const WAIT: Duration = Duration::from_secs(3600);

/// Install a test log subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ordered record of side effects across all fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleOp {
    Load,
    Begin,
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCall {
    Load(String),
    Begin,
    Destroy,
}

/// Console client that records every call and fails on demand.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    calls: Mutex<Vec<ConsoleCall>>,
    chat: Mutex<Vec<String>>,
    failures: Mutex<Vec<ConsoleOp>>,
    journal: Journal,
}

impl ScriptedConsole {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Fail the next call of `op`.
    pub fn fail_next(&self, op: ConsoleOp) {
        self.failures.lock().unwrap().push(op);
    }

    pub fn calls(&self) -> Vec<ConsoleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ConsoleCall::Load(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn chat(&self) -> Vec<String> {
        self.chat.lock().unwrap().clone()
    }

    fn outcome(&self, op: ConsoleOp, call: ConsoleCall) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(call);
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|f| *f == op) {
            Some(index) => {
                failures.remove(index);
                Err(ClientError::Request(format!("scripted {:?} failure", op)))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConsoleClient for ScriptedConsole {
    async fn load_mission(&self, path: &str) -> Result<(), ClientError> {
        self.outcome(ConsoleOp::Load, ConsoleCall::Load(path.to_string()))
    }

    async fn begin_mission(&self) -> Result<(), ClientError> {
        self.outcome(ConsoleOp::Begin, ConsoleCall::Begin)
    }

    async fn destroy_mission(&self) -> Result<(), ClientError> {
        self.outcome(ConsoleOp::Destroy, ConsoleCall::Destroy)
    }

    fn send_chat_to_all(&self, text: &str) {
        self.journal.record(format!("chat:{}", text));
        self.chat.lock().unwrap().push(text.to_string());
    }
}

#[derive(Debug, Default)]
pub struct FakeTelemetry {
    journal: Journal,
}

#[async_trait]
impl TelemetryClient for FakeTelemetry {
    async fn listen(&self, endpoint: &Endpoint) -> Result<(), ClientError> {
        self.journal.record(format!("telemetry:listen:{}", endpoint));
        Ok(())
    }

    async fn stop_listening(&self) {
        self.journal.record("telemetry:stop");
    }
}

/// Test-side control over the console link: inject handshakes and drops
/// through the subscription the supervisor handed to the connector.
#[derive(Clone)]
pub struct LinkControl {
    sender: Arc<Mutex<Option<LinkEventSender>>>,
    console: Arc<ScriptedConsole>,
}

impl LinkControl {
    fn send(&self, event: ConsoleLinkEvent) {
        let sender = self.sender.lock().unwrap().clone();
        let sender = sender.expect("console connect has not been requested yet");
        assert!(sender.send(event), "supervisor is gone");
    }

    pub fn establish(&self) {
        self.send(ConsoleLinkEvent::Established(self.console.clone()));
    }

    pub fn lose(&self, reason: &str) {
        self.send(ConsoleLinkEvent::Lost(reason.to_string()));
    }

    pub fn close(&self) {
        self.send(ConsoleLinkEvent::Closed);
    }

    pub fn fail_attempt(&self, reason: &str) {
        self.send(ConsoleLinkEvent::AttemptFailed(reason.to_string()));
    }
}

struct FakeSession {
    journal: Journal,
}

#[async_trait]
impl ConsoleSession for FakeSession {
    fn stop_trying(&mut self) {
        self.journal.record("console:stop_trying");
    }

    async fn disconnect(&mut self) {
        self.journal.record("console:disconnect");
    }
}

/// Connector that completes the handshake as soon as it is asked to connect.
pub struct FakeConnector {
    control: LinkControl,
    journal: Journal,
}

impl ConsoleConnector for FakeConnector {
    fn connect(&self, endpoint: &Endpoint, events: LinkEventSender) -> Box<dyn ConsoleSession> {
        self.journal.record(format!("console:connect:{}", endpoint));
        *self.control.sender.lock().unwrap() = Some(events);
        self.control.establish();
        Box::new(FakeSession {
            journal: self.journal.clone(),
        })
    }
}

pub fn server_settings() -> ServerSettings {
    ServerSettings {
        console: Endpoint {
            host: "127.0.0.1".to_string(),
            port: 20000,
        },
        telemetry: Endpoint {
            host: "127.0.0.1".to_string(),
            port: 10000,
        },
        event_log: PathBuf::from("/srv/il2/eventlog.lst"),
        missions_dir: PathBuf::from("/srv/il2/Missions"),
    }
}

pub fn temp_catalog_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("minic-it-{}", uuid::Uuid::new_v4()))
        .join("missions.json")
}

/// Catalog of `(name, minutes)` missions with files `<name>.mis`; the first
/// one is selected.
pub fn catalog_of(missions: &[(&str, u32)]) -> MissionCatalog {
    let mut catalog = MissionCatalog::new();
    for (name, minutes) in missions {
        catalog
            .add(MissionDraft::new(*name, *minutes).with_path(format!("{}.mis", name.to_lowercase())))
            .unwrap();
    }
    if let Some(first) = catalog.id_at_index(0) {
        catalog.set_current(Some(first)).unwrap();
    }
    catalog
}

/// A spawned commander wired to scripted links.
pub struct TestBed {
    pub handle: CommanderHandle,
    pub pipes: EventPipes,
    pub console: Arc<ScriptedConsole>,
    pub link: LinkControl,
    pub store: CatalogStore,
    pub journal: Journal,
    pub playback: broadcast::Receiver<PlaybackEvent>,
    pub connection: broadcast::Receiver<ConnectionEvent>,
    task: JoinHandle<()>,
}

impl TestBed {
    pub fn new(catalog: &MissionCatalog) -> Self {
        init_tracing();
        let journal = Journal::default();
        let console = Arc::new(ScriptedConsole::new(journal.clone()));
        let link = LinkControl {
            sender: Arc::new(Mutex::new(None)),
            console: Arc::clone(&console),
        };
        let telemetry = Arc::new(FakeTelemetry {
            journal: journal.clone(),
        });
        let connector = Arc::new(FakeConnector {
            control: link.clone(),
            journal: journal.clone(),
        });

        let store = CatalogStore::new(temp_catalog_path());
        store.save(catalog).unwrap();

        let supervisor = ConnectionSupervisor::new(telemetry, connector, Some(server_settings()));
        let (commander, handle, pipes) = Commander::new(store.clone(), supervisor);
        let playback = handle.subscribe_playback();
        let connection = handle.subscribe_connection();
        let task = commander.spawn();

        Self {
            handle,
            pipes,
            console,
            link,
            store,
            journal,
            playback,
            connection,
            task,
        }
    }

    /// Connect and wait for the console handshake.
    pub async fn connect(&mut self) {
        self.handle.connect().await.unwrap();
        self.wait_for_connection(|e| *e == ConnectionEvent::Connected)
            .await;
    }

    /// Run the current mission and wait until it plays.
    pub async fn play(&mut self) -> Vec<PlaybackEvent> {
        self.handle.run_mission().await.unwrap();
        self.wait_for_state(PlaybackState::Playing).await
    }

    pub async fn wait_for_state(&mut self, state: PlaybackState) -> Vec<PlaybackEvent> {
        wait_for_state(&mut self.playback, state).await
    }

    pub async fn wait_for_connection(
        &mut self,
        matches: impl Fn(&ConnectionEvent) -> bool,
    ) -> ConnectionEvent {
        let rx = &mut self.connection;
        let result = tokio::time::timeout(WAIT, async {
            loop {
                match rx.recv().await {
                    Ok(event) if matches(&event) => return event,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => panic!("connection events closed"),
                }
            }
        })
        .await;
        result.expect("timed out waiting for connection event")
    }

    pub async fn shutdown(self) {
        self.handle.shutdown().await.unwrap();
        self.task.await.unwrap();
        if let Some(dir) = self.store.path().parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

/// Collect playback events up to and including `StateChanged { state }`.
pub async fn wait_for_state(
    rx: &mut broadcast::Receiver<PlaybackEvent>,
    state: PlaybackState,
) -> Vec<PlaybackEvent> {
    let mut seen = Vec::new();
    let result = tokio::time::timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let done = event == PlaybackEvent::StateChanged { state };
                    seen.push(event);
                    if done {
                        return;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("playback events closed"),
            }
        }
    })
    .await;
    assert!(
        result.is_ok(),
        "timed out waiting for {}; saw {:?}",
        state,
        seen
    );
    seen
}

pub fn states(events: &[PlaybackEvent]) -> Vec<PlaybackState> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::StateChanged { state } => Some(*state),
            _ => None,
        })
        .collect()
}

pub fn failures(events: &[PlaybackEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, PlaybackEvent::Failed { .. }))
        .count()
}
