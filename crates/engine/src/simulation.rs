use tracing::trace;

use crate::input::PlayerInput;
use crate::movement::{MovementResolver, MovementStats};
use crate::script::{ScriptEngine, ScriptHost, ScriptMode};
use crate::world::World;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub mode: ScriptMode,
    pub live_entities: usize,
    pub movement: MovementStats,
}

/// Runs one frame in the fixed order: player controls, scripts, movement,
/// post-process, camera follow.
#[derive(Debug)]
pub struct Simulation {
    pub world: World,
    pub scripts: ScriptEngine,
    resolver: MovementResolver,
    frame: u64,
}

impl Simulation {
    pub fn new(world: World) -> Self {
        Self {
            world,
            scripts: ScriptEngine::new(),
            resolver: MovementResolver::new(),
            frame: 0,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn tick(&mut self, dt: f32, input: &PlayerInput, host: &mut dyn ScriptHost) -> FrameStats {
        self.apply_controls(input);
        self.scripts.process(dt, &mut self.world, host);
        let movement = self
            .resolver
            .process(dt, &mut self.world, &mut self.scripts, host);
        self.resolver.post_process(&mut self.world);
        self.world.update_camera();
        self.frame += 1;

        let stats = FrameStats {
            frame: self.frame,
            mode: self.scripts.mode(),
            live_entities: self.world.live_count(),
            movement,
        };
        trace!(frame = stats.frame, mode = ?stats.mode, "frame_complete");
        stats
    }

    fn apply_controls(&mut self, input: &PlayerInput) {
        if self.scripts.mode() != ScriptMode::Gameplay || !self.world.controls_enabled {
            return;
        }
        let Some(player) = self.world.player() else {
            return;
        };
        if let Some(actor) = self.world.components.actors.get_mut(player) {
            actor.moving_direction = input.direction();
            actor.sprinting = input.sprinting();
        }
    }
}
