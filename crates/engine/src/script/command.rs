use serde::{Deserialize, Serialize};

use crate::ecs::{Direction, Entity};
use crate::geometry::Vec2;

/// One scripted instruction. Fields marked `serde(skip)` are runtime state
/// and reset whenever a script is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapCommand {
    MoveTo {
        target: Entity,
        destination: Vec2,
        #[serde(skip)]
        start: Option<Vec2>,
    },
    SetDirection {
        target: Entity,
        direction: Direction,
    },
    Wait {
        seconds: f32,
        #[serde(skip)]
        elapsed: f32,
    },
    Speak {
        #[serde(default)]
        speaker: Option<Entity>,
        text: String,
        #[serde(skip)]
        started: bool,
    },
    TeleportPlayer {
        position: Vec2,
        #[serde(default)]
        layer: Option<u8>,
    },
    SwitchMap {
        map: String,
        #[serde(default)]
        spawn: Option<String>,
    },
    ActivateScript {
        script: String,
    },
    MoveCamera {
        destination: Vec2,
        speed: f32,
    },
    MoveCameraToPlayer {
        speed: f32,
    },
    EnableControls,
    DisableControls,
}

impl MapCommand {
    pub fn move_to(target: Entity, destination: Vec2) -> Self {
        Self::MoveTo {
            target,
            destination,
            start: None,
        }
    }

    pub fn set_direction(target: Entity, direction: Direction) -> Self {
        Self::SetDirection { target, direction }
    }

    pub fn wait(seconds: f32) -> Self {
        Self::Wait {
            seconds,
            elapsed: 0.0,
        }
    }

    pub fn speak(speaker: Option<Entity>, text: impl Into<String>) -> Self {
        Self::Speak {
            speaker,
            text: text.into(),
            started: false,
        }
    }

    pub fn activate_script(script: impl Into<String>) -> Self {
        Self::ActivateScript {
            script: script.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MoveTo { .. } => "move_to",
            Self::SetDirection { .. } => "set_direction",
            Self::Wait { .. } => "wait",
            Self::Speak { .. } => "speak",
            Self::TeleportPlayer { .. } => "teleport_player",
            Self::SwitchMap { .. } => "switch_map",
            Self::ActivateScript { .. } => "activate_script",
            Self::MoveCamera { .. } => "move_camera",
            Self::MoveCameraToPlayer { .. } => "move_camera_to_player",
            Self::EnableControls => "enable_controls",
            Self::DisableControls => "disable_controls",
        }
    }
}

/// An entity's looping program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapCommandList {
    commands: Vec<MapCommand>,
    #[serde(skip)]
    index: usize,
}

impl MapCommandList {
    pub fn new(commands: Vec<MapCommand>) -> Self {
        Self { commands, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&MapCommand> {
        self.commands.get(self.index)
    }

    pub fn current_mut(&mut self) -> Option<&mut MapCommand> {
        self.commands.get_mut(self.index)
    }

    /// Moves to the next command, wrapping to the first.
    pub fn advance(&mut self) {
        if self.commands.is_empty() {
            return;
        }
        self.index = (self.index + 1) % self.commands.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_commands_without_runtime_state() {
        let json = r#"[
            { "type": "move_to", "target": 3, "destination": { "x": 16.0, "y": 32.0 } },
            { "type": "wait", "seconds": 0.5 },
            { "type": "speak", "text": "Hello" },
            { "type": "disable_controls" }
        ]"#;
        let commands: Vec<MapCommand> = serde_json::from_str(json).expect("commands parse");
        assert_eq!(
            commands,
            vec![
                MapCommand::move_to(Entity::from_raw(3), Vec2::new(16.0, 32.0)),
                MapCommand::wait(0.5),
                MapCommand::speak(None, "Hello"),
                MapCommand::DisableControls,
            ]
        );
    }

    #[test]
    fn unknown_command_tags_are_rejected() {
        let result: Result<MapCommand, _> =
            serde_json::from_str(r#"{ "type": "self_destruct" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn list_index_wraps() {
        let mut list = MapCommandList::new(vec![
            MapCommand::wait(1.0),
            MapCommand::EnableControls,
        ]);
        assert_eq!(list.index(), 0);
        list.advance();
        assert_eq!(list.current(), Some(&MapCommand::EnableControls));
        list.advance();
        assert_eq!(list.index(), 0);

        let mut empty = MapCommandList::default();
        empty.advance();
        assert!(empty.current_mut().is_none());
    }
}
