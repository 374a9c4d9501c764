use crate::ecs::Entity;

use super::command::MapCommand;

/// Services the scripting engine borrows from whatever runs the world:
/// dialogue UI, scene switching and the named script library.
pub trait ScriptHost {
    fn start_dialogue(&mut self, speaker: Option<Entity>, text: &str);

    /// Polled every frame while a `Speak` command is in flight.
    fn dialogue_active(&self) -> bool;

    fn switch_map(&mut self, map: &str, spawn: Option<&str>);

    fn script(&self, name: &str) -> Option<Vec<MapCommand>>;
}
