//! Mission playback state machine.
//!
//! ```text
//! Stopped --run--> Loading --load ok--> Starting --begin ok--> Playing
//!    ^                |                    |                      |
//!    +---- failed ----+---- failed --------+      stop / expiry   |
//!    +------------------- destroy done <-- Stopping <-------------+
//! ```
//!
//! Console requests run on spawned tasks and report back through
//! [`PlaybackScheduler::next_completion`]. Every completion carries the
//! generation it was issued under; a reset or a newer command bumps the
//! generation so late completions are discarded instead of applied to a newer
//! state.

use crate::error::{PlaybackError, PlaybackResult};
use crate::state::{time_left_str, PlaybackEvent, PlaybackStage, PlaybackState, PlaybackStatus};
use minic_catalog::{Mission, MissionCatalog, MissionId, MissionLayout};
use minic_core::MissionInfo;
use minic_supervisor::{ClientError, ConsoleClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 256;
const TICK: Duration = Duration::from_secs(1);

/// Result of a console request issued by the scheduler.
#[derive(Debug)]
pub struct Completion {
    generation: u64,
    stage: PlaybackStage,
    result: Result<(), ClientError>,
}

/// Something the scheduler has to react to on its owner's event loop.
#[derive(Debug)]
pub enum Wake {
    Completion(Completion),
    Tick,
}

enum ConsoleRequest {
    Load(String),
    Begin,
    Destroy,
}

impl ConsoleRequest {
    fn stage(&self) -> PlaybackStage {
        match self {
            Self::Load(_) => PlaybackStage::Load,
            Self::Begin => PlaybackStage::Begin,
            Self::Destroy => PlaybackStage::Destroy,
        }
    }
}

/// What to do once the running mission is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowUp {
    Restart,
    Rotate { from: MissionId },
}

pub struct PlaybackScheduler {
    state: PlaybackState,
    /// Snapshot of the mission being loaded
    pending: Option<Mission>,
    /// Snapshot of the mission that was loaded, decoupled from catalog edits
    active: Option<Mission>,
    seconds_remaining: u32,
    was_playing_before_disconnect: bool,
    generation: u64,
    follow_up: Option<FollowUp>,
    console: Option<Arc<dyn ConsoleClient>>,
    countdown: Option<Interval>,
    event_log: Option<PathBuf>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: PlaybackState::Stopped,
            pending: None,
            active: None,
            seconds_remaining: 0,
            was_playing_before_disconnect: false,
            generation: 0,
            follow_up: None,
            console: None,
            countdown: None,
            event_log: None,
            completion_tx,
            completion_rx,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Sender side of the notifications, for handing out more subscriptions.
    pub fn events(&self) -> broadcast::Sender<PlaybackEvent> {
        self.events.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_mission(&self) -> Option<&Mission> {
        self.active.as_ref()
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn was_playing_before_disconnect(&self) -> bool {
        self.was_playing_before_disconnect
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            active_mission: self.active.clone(),
            seconds_remaining: self.seconds_remaining,
            time_left: time_left_str(self.seconds_remaining),
        }
    }

    /// Server event log the mission events are read from.
    pub fn set_event_log(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "Playback event log set");
        self.event_log = Some(path);
    }

    pub fn event_log(&self) -> Option<&Path> {
        self.event_log.as_deref()
    }

    /// Console link became available. Resumes the selected mission when the
    /// previous session ended by connection loss while a mission was playing.
    pub fn start_service(
        &mut self,
        console: Arc<dyn ConsoleClient>,
        connection_was_lost: bool,
        catalog: &MissionCatalog,
    ) {
        self.console = Some(console);
        debug!(
            connection_was_lost,
            was_playing = self.was_playing_before_disconnect,
            "Playback service started"
        );

        if connection_was_lost && self.was_playing_before_disconnect {
            info!("Resuming mission interrupted by connection loss");
            if let Err(e) = self.run(catalog) {
                warn!(error = %e, "Failed to resume mission");
                self.report_unattended_failure(catalog, e);
            }
        }
    }

    /// Console link went away. Everything in flight is abandoned.
    pub fn stop_service(&mut self) {
        self.was_playing_before_disconnect = self.state == PlaybackState::Playing;
        self.generation += 1;
        self.countdown = None;
        self.pending = None;
        self.active = None;
        self.follow_up = None;
        self.seconds_remaining = 0;
        self.console = None;
        self.set_state(PlaybackState::Stopped);
        debug!(
            was_playing = self.was_playing_before_disconnect,
            "Playback service stopped"
        );
    }

    /// Load and begin the catalog's current mission.
    pub fn run(&mut self, catalog: &MissionCatalog) -> PlaybackResult<()> {
        if self.state != PlaybackState::Stopped {
            return Err(PlaybackError::Busy { state: self.state });
        }
        let console = self.console.clone().ok_or(PlaybackError::NotConnected)?;

        let Some(mission) = catalog.current().cloned() else {
            error!("Failed to run mission: current mission is not set");
            return Err(PlaybackError::NoCurrentMission);
        };
        let Some(relative_path) = mission.relative_path.as_deref() else {
            error!(mission_id = %mission.id, "Failed to run mission: mission file is not set");
            return Err(PlaybackError::MissionFileUnset { id: mission.id });
        };
        let path = MissionLayout::load_path(relative_path);

        info!(mission_id = %mission.id, path = %path, "Loading mission");
        self.chat(&format!("Loading mission '{}'...", mission.name));
        self.pending = Some(mission);
        self.set_state(PlaybackState::Loading);
        self.generation += 1;
        self.request(console, ConsoleRequest::Load(path));
        Ok(())
    }

    /// Destroy the running mission. A no-op when nothing is running.
    pub fn stop(&mut self) -> PlaybackResult<()> {
        self.stop_with(None)
    }

    /// Stop, then run the current mission again once destroyed.
    pub fn restart(&mut self, catalog: &MissionCatalog) -> PlaybackResult<()> {
        match self.state {
            PlaybackState::Stopped => self.run(catalog),
            PlaybackState::Stopping => {
                self.follow_up = Some(FollowUp::Restart);
                Ok(())
            }
            _ => {
                if let Some(name) = self.mission_in_flight().map(|m| m.name.clone()) {
                    self.chat(&format!("Restarting mission '{}'...", name));
                }
                self.stop_with(Some(FollowUp::Restart))
            }
        }
    }

    fn stop_with(&mut self, follow_up: Option<FollowUp>) -> PlaybackResult<()> {
        if matches!(self.state, PlaybackState::Stopped | PlaybackState::Stopping) {
            return Ok(());
        }
        let Some(console) = self.console.clone() else {
            self.stop_service();
            return Err(PlaybackError::NotConnected);
        };

        // A stop during loading still owns the loaded mission once destroyed
        if self.active.is_none() {
            self.active = self.pending.take();
        }
        let name = self.mission_in_flight().map(|m| m.name.clone()).unwrap_or_default();

        self.countdown = None;
        self.follow_up = follow_up;
        self.set_state(PlaybackState::Stopping);
        info!(mission = %name, follow_up = ?follow_up, "Stopping mission");
        self.chat(&format!("Stopping mission '{}'...", name));
        self.generation += 1;
        self.request(console, ConsoleRequest::Destroy);
        Ok(())
    }

    fn mission_in_flight(&self) -> Option<&Mission> {
        self.active.as_ref().or(self.pending.as_ref())
    }

    fn request(&self, console: Arc<dyn ConsoleClient>, request: ConsoleRequest) {
        let tx = self.completion_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let stage = request.stage();
            let result = match request {
                ConsoleRequest::Load(path) => console.load_mission(&path).await,
                ConsoleRequest::Begin => console.begin_mission().await,
                ConsoleRequest::Destroy => console.destroy_mission().await,
            };
            let _ = tx.send(Completion {
                generation,
                stage,
                result,
            });
        });
    }

    /// Next console request completion. Cancel safe.
    pub async fn next_completion(&mut self) -> Completion {
        match self.completion_rx.recv().await {
            Some(completion) => completion,
            None => std::future::pending().await,
        }
    }

    /// Next countdown tick; pending forever while no countdown runs.
    pub async fn countdown_tick(&mut self) {
        match self.countdown.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }

    /// Next completion or countdown tick, whichever comes first. Cancel safe.
    pub async fn next_wake(&mut self) -> Wake {
        let countdown = &mut self.countdown;
        let completions = &mut self.completion_rx;
        tokio::select! {
            Some(completion) = completions.recv() => Wake::Completion(completion),
            _ = async {
                match countdown.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            } => Wake::Tick,
        }
    }

    /// Apply a [`Wake`]; see [`PlaybackScheduler::handle_completion`].
    pub fn handle_wake(&mut self, wake: Wake, catalog: &mut MissionCatalog) -> Option<MissionId> {
        match wake {
            Wake::Completion(completion) => self.handle_completion(completion, catalog),
            Wake::Tick => {
                self.on_timer_tick();
                None
            }
        }
    }

    /// Apply a console request completion.
    ///
    /// Returns the mission rotation selected when this completion advanced the
    /// catalog's current mission.
    pub fn handle_completion(
        &mut self,
        completion: Completion,
        catalog: &mut MissionCatalog,
    ) -> Option<MissionId> {
        if completion.generation != self.generation {
            debug!(
                stage = ?completion.stage,
                generation = completion.generation,
                current = self.generation,
                "Discarding stale completion"
            );
            return None;
        }

        match (completion.stage, self.state) {
            (PlaybackStage::Load, PlaybackState::Loading) => {
                self.on_loaded(completion.result);
                None
            }
            (PlaybackStage::Begin, PlaybackState::Starting) => {
                self.on_begun(completion.result);
                None
            }
            (PlaybackStage::Destroy, PlaybackState::Stopping) => {
                self.on_destroyed(completion.result, catalog)
            }
            (stage, state) => {
                debug!(stage = ?stage, state = %state, "Ignoring completion for another state");
                None
            }
        }
    }

    fn on_loaded(&mut self, result: Result<(), ClientError>) {
        let mission = self.pending.take();
        let mission_id = mission.as_ref().map(|m| m.id);

        if let Err(e) = result {
            error!(mission_id = ?mission_id, error = %e, "Failed to load mission");
            self.chat("Failed to load mission.");
            self.set_state(PlaybackState::Stopped);
            self.fail(mission_id, PlaybackStage::Load, e);
            return;
        }
        let (Some(mission), Some(console)) = (mission, self.console.clone()) else {
            self.set_state(PlaybackState::Stopped);
            return;
        };

        self.chat(&format!("Starting mission '{}'...", mission.name));
        self.active = Some(mission);
        self.set_state(PlaybackState::Starting);
        self.generation += 1;
        self.request(console, ConsoleRequest::Begin);
    }

    fn on_begun(&mut self, result: Result<(), ClientError>) {
        if let Err(e) = result {
            let mission_id = self.active.take().map(|m| m.id);
            error!(mission_id = ?mission_id, error = %e, "Failed to begin mission");
            self.chat("Failed to start mission.");
            self.set_state(PlaybackState::Stopped);
            self.fail(mission_id, PlaybackStage::Begin, e);
            return;
        }
        let Some(mission) = self.active.clone() else {
            self.set_state(PlaybackState::Stopped);
            return;
        };

        self.seconds_remaining = mission.duration_secs();
        self.countdown = Some(tokio::time::interval_at(Instant::now() + TICK, TICK));
        self.set_state(PlaybackState::Playing);
        info!(
            mission_id = %mission.id,
            seconds = self.seconds_remaining,
            "Mission is playing"
        );
        self.chat(&format!("Mission '{}' is playing.", mission.name));
        self.chat(&format!("Time left: {}.", time_left_str(self.seconds_remaining)));
    }

    fn on_destroyed(
        &mut self,
        result: Result<(), ClientError>,
        catalog: &mut MissionCatalog,
    ) -> Option<MissionId> {
        self.countdown = None;
        self.seconds_remaining = 0;
        let stopped = self.active.take();
        let follow_up = self.follow_up.take();

        if let Err(e) = result {
            let mission_id = stopped.map(|m| m.id);
            error!(mission_id = ?mission_id, error = %e, "Failed to stop mission");
            self.chat("Failed to stop mission.");
            self.set_state(PlaybackState::Stopped);
            self.fail(mission_id, PlaybackStage::Destroy, e);
            return None;
        }
        if let Some(mission) = &stopped {
            self.chat(&format!("Mission '{}' was stopped.", mission.name));
        }

        let Some(follow_up) = follow_up else {
            self.set_state(PlaybackState::Stopped);
            return None;
        };

        let mut rotated = None;
        if let FollowUp::Rotate { from } = follow_up {
            match catalog.next_in_rotation(from) {
                Some(next) if catalog.set_current(Some(next)).is_ok() => {
                    info!(from = %from, to = %next, "Rotating to next mission");
                    rotated = Some(next);
                }
                _ => {
                    info!("Catalog is empty, rotation stops");
                    self.set_state(PlaybackState::Stopped);
                    return None;
                }
            }
        }

        // Straight from Stopping to Loading; observers never see Stopped
        self.state = PlaybackState::Stopped;
        if let Err(e) = self.run(catalog) {
            warn!(error = %e, follow_up = ?follow_up, "Could not run next mission");
            self.emit(PlaybackEvent::StateChanged {
                state: PlaybackState::Stopped,
            });
            self.report_unattended_failure(catalog, e);
        }
        rotated
    }

    /// One countdown second elapsed.
    pub fn on_timer_tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        self.emit(PlaybackEvent::TimerTick {
            seconds_remaining: self.seconds_remaining,
        });

        if self.seconds_remaining == 0 {
            let Some(from) = self.active.as_ref().map(|m| m.id) else {
                return;
            };
            debug!(mission_id = %from, "Mission time is up");
            if let Err(e) = self.stop_with(Some(FollowUp::Rotate { from })) {
                warn!(error = %e, "Failed to stop expired mission");
            }
        }
    }

    /// Server log reported a mission start.
    pub fn on_began(&mut self, info: &MissionInfo) {
        match &self.active {
            None => debug!(token = %info.token, "Ignoring mission start not issued by us"),
            Some(mission) => {
                debug!(mission_id = %mission.id, token = %info.token, state = %self.state, "Mission began")
            }
        }
    }

    /// Server log reported a mission end. Only a playing mission is affected;
    /// ends we caused ourselves are handled by the destroy completion.
    pub fn on_ended(&mut self, info: &MissionInfo) {
        if self.state != PlaybackState::Playing {
            debug!(token = %info.token, state = %self.state, "Ignoring mission end");
            return;
        }
        let Some(mission) = self.active.take() else {
            return;
        };

        info!(mission_id = %mission.id, token = %info.token, "Mission ended on the server");
        self.chat(&format!("Mission '{}' was stopped.", mission.name));
        self.countdown = None;
        self.seconds_remaining = 0;
        self.generation += 1;
        self.set_state(PlaybackState::Stopped);
    }

    fn chat(&self, text: &str) {
        debug!(text = %text, "Chat to all");
        if let Some(console) = &self.console {
            console.send_chat_to_all(text);
        }
    }

    /// A run nobody asked for (rotation, resume) has no caller to hand the
    /// error to, so it goes to the operator like a console failure.
    fn report_unattended_failure(&self, catalog: &MissionCatalog, error: PlaybackError) {
        let mission = match error {
            PlaybackError::MissionFileUnset { id } => Some(id),
            _ => catalog.current_id(),
        };
        self.chat("Failed to load mission.");
        self.emit(PlaybackEvent::Failed {
            mission,
            stage: PlaybackStage::Prepare,
            reason: error.to_string(),
        });
    }

    fn fail(&self, mission: Option<MissionId>, stage: PlaybackStage, error: ClientError) {
        self.emit(PlaybackEvent::Failed {
            mission,
            stage,
            reason: error.to_string(),
        });
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "Playback state changed");
        self.state = state;
        self.emit(PlaybackEvent::StateChanged { state });
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
