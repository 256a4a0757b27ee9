//! Fan-out of parsed server events to the commander's services.
//!
//! | Source           | Sinks                     |
//! |------------------|---------------------------|
//! | console replies  | pilots                    |
//! | telemetry        | pilots, objects           |
//! | server event log | pilots, objects, missions |
//!
//! The router starts and stops its children as a unit whenever the console
//! link comes and goes.

use crate::objects::ObjectTracker;
use crate::pilots::PilotTracker;
use minic_catalog::MissionCatalog;
use minic_core::{ConsoleReply, ServerLogEvent, ServerSettings, TelemetryReply};
use minic_playback::PlaybackScheduler;
use minic_supervisor::ConsoleClient;
use std::sync::Arc;
use tracing::{debug, info};

pub const GREETING: &str = "Hello! Minicommander takes control over this server.";
pub const FAREWELL: &str = "Minicommander quits. Good bye!";

#[derive(Default)]
pub struct CommandRouter {
    pilots: PilotTracker,
    objects: ObjectTracker,
    missions: PlaybackScheduler,
    console: Option<Arc<dyn ConsoleClient>>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.console.is_some()
    }

    pub fn pilots(&self) -> &PilotTracker {
        &self.pilots
    }

    pub fn objects(&self) -> &ObjectTracker {
        &self.objects
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.missions
    }

    pub fn scheduler_mut(&mut self) -> &mut PlaybackScheduler {
        &mut self.missions
    }

    /// Start every service on a freshly established console connection.
    pub fn start(
        &mut self,
        console: Arc<dyn ConsoleClient>,
        connection_was_lost: bool,
        settings: &ServerSettings,
        catalog: &MissionCatalog,
    ) {
        info!(connection_was_lost, "Starting commander services");
        self.missions.set_event_log(settings.event_log.clone());
        self.console = Some(Arc::clone(&console));

        self.pilots.start();
        self.objects.start();
        self.missions
            .start_service(Arc::clone(&console), connection_was_lost, catalog);

        console.send_chat_to_all(GREETING);
    }

    /// Stop every service, in reverse start order. The farewell is only sent
    /// while the console is still reachable.
    pub fn stop(&mut self, connected: bool) {
        let Some(console) = self.console.take() else {
            return;
        };
        info!(connected, "Stopping commander services");
        if connected {
            console.send_chat_to_all(FAREWELL);
        }

        self.missions.stop_service();
        self.objects.stop();
        self.pilots.stop();
    }

    pub fn on_console_reply(&mut self, reply: &ConsoleReply) {
        self.pilots.on_console_reply(reply);
    }

    pub fn on_telemetry_reply(&mut self, reply: &TelemetryReply) {
        self.pilots.on_telemetry_reply(reply);
        self.objects.on_telemetry_reply(reply);
    }

    pub fn on_log_event(&mut self, event: &ServerLogEvent) {
        self.pilots.on_log_event(event);
        self.objects.on_log_event(event);
        if !self.is_running() {
            debug!(event = ?event, "Commander not running, mission event dropped");
            return;
        }
        match event {
            ServerLogEvent::MissionBegan(info) => self.missions.on_began(info),
            ServerLogEvent::MissionEnded(info) => self.missions.on_ended(info),
            _ => {}
        }
    }
}
