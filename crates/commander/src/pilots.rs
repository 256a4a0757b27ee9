//! Online pilot bookkeeping.

use minic_core::{ConsoleReply, Position, ServerLogEvent, TelemetryReply};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pilot {
    pub callsign: String,
    pub channel: u32,
    pub address: String,
    /// Aircraft of the current sortie, if the pilot is in the air
    pub aircraft: Option<String>,
    pub position: Option<Position>,
    pub deaths: u32,
}

#[derive(Debug, Default)]
pub struct PilotTracker {
    pilots: BTreeMap<String, Pilot>,
    running: bool,
}

impl PilotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.pilots.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn get(&self, callsign: &str) -> Option<&Pilot> {
        self.pilots.get(callsign)
    }

    /// Online pilots ordered by callsign.
    pub fn online(&self) -> impl Iterator<Item = &Pilot> {
        self.pilots.values()
    }

    pub fn count(&self) -> usize {
        self.pilots.len()
    }

    pub fn on_console_reply(&mut self, reply: &ConsoleReply) {
        if !self.running {
            return;
        }
        match reply {
            ConsoleReply::PilotJoined {
                callsign,
                channel,
                address,
            } => {
                debug!(callsign = %callsign, channel, "Pilot joined");
                self.pilots.insert(
                    callsign.clone(),
                    Pilot {
                        callsign: callsign.clone(),
                        channel: *channel,
                        address: address.clone(),
                        aircraft: None,
                        position: None,
                        deaths: 0,
                    },
                );
            }
            ConsoleReply::PilotLeft { callsign } => {
                debug!(callsign = %callsign, "Pilot left");
                self.pilots.remove(callsign);
            }
            ConsoleReply::Chat { callsign, text } => {
                trace!(callsign = %callsign, text = %text, "Chat");
            }
        }
    }

    pub fn on_telemetry_reply(&mut self, reply: &TelemetryReply) {
        if !self.running {
            return;
        }
        if let TelemetryReply::PilotPosition { callsign, position } = reply {
            if let Some(pilot) = self.pilots.get_mut(callsign) {
                pilot.position = Some(*position);
            }
        }
    }

    pub fn on_log_event(&mut self, event: &ServerLogEvent) {
        if !self.running {
            return;
        }
        match event {
            ServerLogEvent::PilotSpawned { callsign, aircraft } => {
                if let Some(pilot) = self.pilots.get_mut(callsign) {
                    pilot.aircraft = Some(aircraft.clone());
                }
            }
            ServerLogEvent::PilotKilled { callsign } => {
                if let Some(pilot) = self.pilots.get_mut(callsign) {
                    pilot.aircraft = None;
                    pilot.position = None;
                    pilot.deaths += 1;
                }
            }
            ServerLogEvent::MissionEnded(_) => {
                for pilot in self.pilots.values_mut() {
                    pilot.aircraft = None;
                    pilot.position = None;
                }
            }
            _ => {}
        }
    }
}
