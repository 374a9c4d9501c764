use std::mem;

use tracing::{debug, info, warn};

use crate::ecs::{Direction, Entity};
use crate::geometry::Vec2;
use crate::world::World;

use super::command::MapCommand;
use super::host::ScriptHost;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScriptMode {
    /// Every entity with a command list runs its current command each frame.
    #[default]
    Gameplay,
    /// Only the cutscene batch runs.
    Cutscene,
}

#[derive(Debug, Default)]
pub struct ScriptEngine {
    mode: ScriptMode,
    cutscene: Vec<MapCommand>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ScriptMode {
        self.mode
    }

    pub fn cutscene(&self) -> &[MapCommand] {
        &self.cutscene
    }

    /// Adds commands to the cutscene batch. An empty batch leaves the
    /// engine in gameplay mode.
    pub fn start_cutscene(&mut self, commands: Vec<MapCommand>) {
        self.cutscene.extend(commands);
        if self.cutscene.is_empty() {
            self.mode = ScriptMode::Gameplay;
            return;
        }
        if self.mode != ScriptMode::Cutscene {
            info!(commands = self.cutscene.len(), "cutscene_started");
        }
        self.mode = ScriptMode::Cutscene;
    }

    /// Drops every in-flight cutscene command; effects already applied stay.
    pub fn cancel_cutscene(&mut self) {
        let dropped = self.cutscene.len();
        self.cutscene.clear();
        self.mode = ScriptMode::Gameplay;
        info!(dropped, "cutscene_cancelled");
    }

    pub fn cancel_cutscene_command(&mut self, index: usize) -> Option<MapCommand> {
        if index >= self.cutscene.len() {
            warn!(index, len = self.cutscene.len(), "cutscene_cancel_out_of_range");
            return None;
        }
        let removed = self.cutscene.swap_remove(index);
        if self.cutscene.is_empty() {
            self.mode = ScriptMode::Gameplay;
        }
        Some(removed)
    }

    pub fn process(&mut self, dt: f32, world: &mut World, host: &mut dyn ScriptHost) {
        match self.mode {
            ScriptMode::Gameplay => self.process_gameplay(dt, world, host),
            ScriptMode::Cutscene => self.process_cutscene(dt, world, host),
        }
    }

    fn process_gameplay(&mut self, dt: f32, world: &mut World, host: &mut dyn ScriptHost) {
        let entities = world.components.command_lists.entities().to_vec();
        for entity in entities {
            // The list leaves its store while it runs so commands can borrow
            // the world mutably.
            if !world.components.command_lists.contains(entity) {
                continue;
            }
            let Some(mut list) = world.components.command_lists.remove(entity) else {
                continue;
            };
            if let Some(command) = list.current_mut() {
                if self.execute_command(command, dt, world, host) {
                    list.advance();
                }
            }
            if world.is_alive(entity) && !world.components.command_lists.contains(entity) {
                world.components.command_lists.add(entity, list);
            }
        }
    }

    fn process_cutscene(&mut self, dt: f32, world: &mut World, host: &mut dyn ScriptHost) {
        let mut batch = mem::take(&mut self.cutscene);
        let mut index = 0;
        while index < batch.len() {
            if self.execute_command(&mut batch[index], dt, world, host) {
                let done = batch.swap_remove(index);
                debug!(command = done.kind(), "cutscene_command_finished");
            } else {
                index += 1;
            }
        }
        // Commands activated while the batch was out join it for next frame.
        batch.append(&mut self.cutscene);
        self.cutscene = batch;
        if self.cutscene.is_empty() && self.mode == ScriptMode::Cutscene {
            self.mode = ScriptMode::Gameplay;
            info!("cutscene_finished");
        }
    }

    /// Runs one step of `command`; returns `true` once it has completed.
    pub fn execute_command(
        &mut self,
        command: &mut MapCommand,
        dt: f32,
        world: &mut World,
        host: &mut dyn ScriptHost,
    ) -> bool {
        match command {
            MapCommand::MoveTo {
                target,
                destination,
                start,
            } => move_to(world, *target, *destination, start),
            MapCommand::SetDirection { target, direction } => {
                set_direction(world, *target, *direction);
                true
            }
            MapCommand::Wait { seconds, elapsed } => {
                *elapsed += dt;
                if *elapsed < *seconds {
                    return false;
                }
                *elapsed = 0.0;
                true
            }
            MapCommand::Speak {
                speaker,
                text,
                started,
            } => {
                if !*started {
                    host.start_dialogue(*speaker, text);
                    *started = true;
                    return false;
                }
                if host.dialogue_active() {
                    return false;
                }
                *started = false;
                true
            }
            MapCommand::TeleportPlayer { position, layer } => {
                let Some(player) = world.player() else {
                    warn!("teleport_without_player");
                    return true;
                };
                if let Some(layer) = *layer {
                    world.set_layer(player, layer);
                }
                world.place_entity(player, *position);
                true
            }
            MapCommand::SwitchMap { map, spawn } => {
                info!(map = %map, spawn = ?spawn, "map_switch_requested");
                host.switch_map(map, spawn.as_deref());
                true
            }
            MapCommand::ActivateScript { script } => {
                match host.script(script) {
                    Some(commands) => {
                        debug!(script = %script, commands = commands.len(), "script_activated");
                        self.start_cutscene(commands);
                    }
                    None => warn!(script = %script, "script_not_found"),
                }
                true
            }
            MapCommand::MoveCamera { destination, speed } => {
                world.camera.move_toward(*destination, *speed, dt)
            }
            MapCommand::MoveCameraToPlayer { speed } => {
                let Some((player, focus)) = world
                    .player()
                    .and_then(|player| Some((player, world.focus_point(player)?)))
                else {
                    warn!("camera_to_player_without_player");
                    return true;
                };
                let arrived = world.camera.move_toward(focus, *speed, dt);
                if arrived {
                    world.camera.follow(player);
                }
                arrived
            }
            MapCommand::EnableControls => {
                world.controls_enabled = true;
                true
            }
            MapCommand::DisableControls => {
                world.controls_enabled = false;
                true
            }
        }
    }
}

fn set_direction(world: &mut World, target: Entity, direction: Direction) {
    if direction == Direction::None {
        warn!(entity = target.raw(), "set_direction_none");
        return;
    }
    let Some(actor) = world.components.actors.get_mut(target) else {
        debug_assert!(false, "set_direction target {target} has no actor");
        return;
    };
    actor.direction = direction;
}

/// Steers `target` toward `destination` one axis sign at a time. An axis is
/// done once its remaining displacement is zero or points opposite to the
/// displacement at the start; an overshoot is clamped back onto the target.
fn move_to(world: &mut World, target: Entity, destination: Vec2, start: &mut Option<Vec2>) -> bool {
    let Some(position) = world.components.positions.get(target).copied() else {
        debug_assert!(false, "move_to target {target} has no position");
        return true;
    };
    if !world.components.actors.contains(target) {
        debug_assert!(false, "move_to target {target} has no actor");
        return true;
    }
    let origin = *start.get_or_insert(position);

    let axis = |live: f32, from: f32, to: f32| -> (i8, f32) {
        let remaining = to - live;
        let initial = to - from;
        let overshot = remaining != 0.0 && initial != 0.0 && remaining.signum() != initial.signum();
        if remaining == 0.0 || overshot {
            (0, to)
        } else {
            (remaining.signum() as i8, live)
        }
    };
    let (sx, x) = axis(position.x, origin.x, destination.x);
    let (sy, y) = axis(position.y, origin.y, destination.y);

    let settled = Vec2::new(x, y);
    if settled != position {
        world.place_entity(target, settled);
    }

    let Some(actor) = world.components.actors.get_mut(target) else {
        return true;
    };
    if sx == 0 && sy == 0 {
        actor.moving = false;
        *start = None;
        return true;
    }
    actor.direction = Direction::from_signs(sx, sy);
    actor.moving = true;
    false
}
