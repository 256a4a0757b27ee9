//! Objects seen through telemetry during the current mission.

use minic_core::{Position, ServerLogEvent, TelemetryReply};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedObject {
    pub name: String,
    pub position: Option<Position>,
    pub destroyed: bool,
}

#[derive(Debug, Default)]
pub struct ObjectTracker {
    objects: BTreeMap<String, TrackedObject>,
    running: bool,
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.objects.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn get(&self, name: &str) -> Option<&TrackedObject> {
        self.objects.get(name)
    }

    pub fn alive(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.values().filter(|o| !o.destroyed)
    }

    pub fn on_telemetry_reply(&mut self, reply: &TelemetryReply) {
        if !self.running {
            return;
        }
        if let TelemetryReply::ObjectPosition { name, position } = reply {
            let object = self
                .objects
                .entry(name.clone())
                .or_insert_with(|| TrackedObject {
                    name: name.clone(),
                    position: None,
                    destroyed: false,
                });
            object.position = Some(*position);
        }
    }

    pub fn on_log_event(&mut self, event: &ServerLogEvent) {
        if !self.running {
            return;
        }
        match event {
            ServerLogEvent::ObjectDestroyed { name } => {
                debug!(object = %name, "Object destroyed");
                let object = self
                    .objects
                    .entry(name.clone())
                    .or_insert_with(|| TrackedObject {
                        name: name.clone(),
                        position: None,
                        destroyed: false,
                    });
                object.destroyed = true;
            }
            // Objects belong to a mission
            ServerLogEvent::MissionBegan(_) | ServerLogEvent::MissionEnded(_) => {
                self.objects.clear();
            }
            _ => {}
        }
    }
}
