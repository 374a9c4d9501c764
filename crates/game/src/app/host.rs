use std::collections::HashMap;

use tileworld_engine::{Entity, MapCommand, ScriptHost};
use tracing::{info, warn};

pub(crate) const DEFAULT_DIALOGUE_SECONDS: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MapSwitch {
    pub(crate) map: String,
    pub(crate) spawn: Option<String>,
}

#[derive(Debug)]
struct OpenDialogue {
    remaining_seconds: f32,
}

/// Headless stand-in for the dialogue UI: lines are logged and dismissed
/// after a fixed reading time.
#[derive(Debug)]
pub(crate) struct DemoHost {
    scripts: HashMap<String, Vec<MapCommand>>,
    dialogue_seconds: f32,
    dialogue: Option<OpenDialogue>,
    pending_switch: Option<MapSwitch>,
    transcript: Vec<String>,
}

impl DemoHost {
    pub(crate) fn new(scripts: HashMap<String, Vec<MapCommand>>, dialogue_seconds: f32) -> Self {
        Self {
            scripts,
            dialogue_seconds,
            dialogue: None,
            pending_switch: None,
            transcript: Vec::new(),
        }
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        let Some(open) = self.dialogue.as_mut() else {
            return;
        };
        open.remaining_seconds -= dt;
        if open.remaining_seconds <= 0.0 {
            self.dialogue = None;
            info!("dialogue_closed");
        }
    }

    pub(crate) fn take_map_switch(&mut self) -> Option<MapSwitch> {
        self.pending_switch.take()
    }

    pub(crate) fn transcript(&self) -> &[String] {
        &self.transcript
    }
}

impl ScriptHost for DemoHost {
    fn start_dialogue(&mut self, speaker: Option<Entity>, text: &str) {
        if self.dialogue.is_some() {
            warn!(text, "dialogue_replaced");
        }
        info!(speaker = ?speaker.map(Entity::raw), text, "dialogue_opened");
        self.transcript.push(text.to_owned());
        self.dialogue = Some(OpenDialogue {
            remaining_seconds: self.dialogue_seconds,
        });
    }

    fn dialogue_active(&self) -> bool {
        self.dialogue.is_some()
    }

    fn switch_map(&mut self, map: &str, spawn: Option<&str>) {
        self.pending_switch = Some(MapSwitch {
            map: map.to_owned(),
            spawn: spawn.map(str::to_owned),
        });
    }

    fn script(&self, name: &str) -> Option<Vec<MapCommand>> {
        self.scripts.get(name).cloned()
    }
}
