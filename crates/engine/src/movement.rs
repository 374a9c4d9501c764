use std::mem;

use tracing::{debug, trace, warn};

use crate::ecs::{Actor, BodyKind, Entity, InteractionMode};
use crate::geometry::{minimum_translation, Rect, Vec2};
use crate::script::{ScriptEngine, ScriptHost};
use crate::spatial::SpatialHit;
use crate::world::World;

/// Per-frame counters from one movement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementStats {
    pub actors_moved: u32,
    pub collisions_resolved: u32,
    pub collisions_unresolved: u32,
    pub interactions_fired: u32,
    pub entities_freed: u32,
}

impl MovementStats {
    pub fn accumulate(&mut self, other: MovementStats) {
        self.actors_moved += other.actors_moved;
        self.collisions_resolved += other.collisions_resolved;
        self.collisions_unresolved += other.collisions_unresolved;
        self.interactions_fired += other.interactions_fired;
        self.entities_freed += other.entities_freed;
    }
}

/// Integrates actor velocity, resolves solid and tile overlaps and fires
/// soft-body interactions. Scratch buffers are reused across frames.
#[derive(Debug, Default)]
pub struct MovementResolver {
    hits: Vec<SpatialHit>,
    tile_hits: Vec<Rect>,
    targets: Vec<Entity>,
}

impl MovementResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(
        &mut self,
        dt: f32,
        world: &mut World,
        scripts: &mut ScriptEngine,
        host: &mut dyn ScriptHost,
    ) -> MovementStats {
        let mut stats = MovementStats::default();
        let actors = world.components.actors.entities().to_vec();
        for entity in actors {
            // Fleeting interactions may free actors later in the list.
            if !world.is_alive(entity) {
                continue;
            }
            self.move_actor(entity, dt, world, scripts, host, &mut stats);
        }
        release_interactions(world);
        trace!(
            moved = stats.actors_moved,
            resolved = stats.collisions_resolved,
            fired = stats.interactions_fired,
            "movement_pass"
        );
        stats
    }

    /// Clears per-frame player intent. Runs after every movement pass.
    pub fn post_process(&mut self, world: &mut World) {
        for actor in world.components.actors.values_mut() {
            actor.moving_direction = Default::default();
        }
    }

    fn move_actor(
        &mut self,
        entity: Entity,
        dt: f32,
        world: &mut World,
        scripts: &mut ScriptEngine,
        host: &mut dyn ScriptHost,
        stats: &mut MovementStats,
    ) {
        let Some(actor) = world.components.actors.get(entity).copied() else {
            return;
        };
        let Some(position) = world.components.positions.get(entity).copied() else {
            return;
        };
        let velocity = frame_velocity(&actor, position, dt, world.config().sprint_multiplier);

        let Some(hitbox) = world.components.hitboxes.get(entity).copied() else {
            self.commit(world, entity, position + velocity, velocity, stats);
            return;
        };

        let layer = world.components.layer_of(entity);
        // Stationary and soft-bodied actors are pushed out of overlaps too.
        let candidate = hitbox.rect.translated(velocity);
        let candidate = self.resolve_solids(world, entity, layer, candidate, stats);
        let candidate = self.resolve_tiles(world, entity, layer, candidate, stats);

        let displacement = candidate.origin() - hitbox.rect.origin();
        if candidate != hitbox.rect {
            if let Some(stored) = world.components.hitboxes.get_mut(entity) {
                stored.rect = candidate;
            }
            world
                .spatial
                .relocate(layer, hitbox.body, &hitbox.rect, &candidate, entity);
        }
        self.commit(world, entity, position + displacement, displacement, stats);
        self.trigger_interactions(entity, layer, &candidate, dt, world, scripts, host, stats);
    }

    fn commit(
        &mut self,
        world: &mut World,
        entity: Entity,
        position: Vec2,
        displacement: Vec2,
        stats: &mut MovementStats,
    ) {
        if !displacement.is_zero() {
            stats.actors_moved += 1;
        }
        if let Some(stored) = world.components.positions.get_mut(entity) {
            *stored = position;
        }
        if let Some(actor) = world.components.actors.get_mut(entity) {
            actor.last_velocity = displacement;
        }
    }

    /// Pushes out of the most recently reported solid overlap, re-querying
    /// after each push.
    fn resolve_solids(
        &mut self,
        world: &World,
        entity: Entity,
        layer: u8,
        mut candidate: Rect,
        stats: &mut MovementStats,
    ) -> Rect {
        for _ in 0..world.config().max_collision_attempts {
            self.hits.clear();
            world
                .spatial
                .query_into(layer, BodyKind::Solid, &candidate, Some(entity), &mut self.hits);
            let Some(last) = self.hits.last() else {
                return candidate;
            };
            candidate = candidate.translated(minimum_translation(&candidate, &last.rect));
            stats.collisions_resolved += 1;
        }
        self.hits.clear();
        world
            .spatial
            .query_into(layer, BodyKind::Solid, &candidate, Some(entity), &mut self.hits);
        if !self.hits.is_empty() {
            debug!(entity = entity.raw(), overlaps = self.hits.len(), "solid_collision_unresolved");
            stats.collisions_unresolved += 1;
        }
        candidate
    }

    fn resolve_tiles(
        &mut self,
        world: &World,
        entity: Entity,
        layer: u8,
        mut candidate: Rect,
        stats: &mut MovementStats,
    ) -> Rect {
        let cap = world.config().max_tile_collision_attempts;
        let mut attempts = 0u32;
        loop {
            self.tile_hits.clear();
            world.tiles.query_into(layer, &candidate, &mut self.tile_hits);
            let Some(tile) = self.tile_hits.last().copied() else {
                return candidate;
            };
            if cap.is_some_and(|cap| attempts >= cap) {
                warn!(entity = entity.raw(), attempts, "tile_collision_unresolved");
                stats.collisions_unresolved += 1;
                return candidate;
            }
            candidate = candidate.translated(minimum_translation(&candidate, &tile));
            attempts += 1;
            stats.collisions_resolved += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn trigger_interactions(
        &mut self,
        entity: Entity,
        layer: u8,
        rect: &Rect,
        dt: f32,
        world: &mut World,
        scripts: &mut ScriptEngine,
        host: &mut dyn ScriptHost,
        stats: &mut MovementStats,
    ) {
        self.hits.clear();
        world
            .spatial
            .query_into(layer, BodyKind::Soft, rect, Some(entity), &mut self.hits);
        let mut targets = mem::take(&mut self.targets);
        targets.clear();
        targets.extend(self.hits.iter().map(|hit| hit.entity));

        for &target in &targets {
            // The interaction leaves its store while its command runs.
            if !world.components.interactions.contains(target) {
                continue;
            }
            let Some(mut interaction) = world.components.interactions.remove(target) else {
                continue;
            };
            interaction.pressed = true;
            if !interaction.active {
                debug!(
                    source = entity.raw(),
                    target = target.raw(),
                    command = interaction.command.kind(),
                    "interaction_fired"
                );
                scripts.execute_command(&mut interaction.command, dt, world, host);
                stats.interactions_fired += 1;
                match interaction.mode {
                    InteractionMode::Fleeting => {
                        if world.free_entity(target) {
                            stats.entities_freed += 1;
                        }
                        continue;
                    }
                    InteractionMode::PressurePlate => interaction.active = true,
                    InteractionMode::Continuous => {}
                }
            }
            if world.is_alive(target) && !world.components.interactions.contains(target) {
                world.components.interactions.add(target, interaction);
            }
        }
        self.targets = targets;
    }
}

/// Interactions nobody stood on this frame re-arm.
fn release_interactions(world: &mut World) {
    for interaction in world.components.interactions.values_mut() {
        if !interaction.pressed {
            interaction.active = false;
        }
        interaction.pressed = false;
    }
}

fn frame_velocity(actor: &Actor, position: Vec2, dt: f32, sprint_multiplier: f32) -> Vec2 {
    let sprint = if actor.sprinting { sprint_multiplier } else { 1.0 };
    let velocity = actor.intended_direction().unit_vector() * (actor.speed * sprint * dt);
    Vec2::new(
        glide(position.x, velocity.x, actor.last_velocity.x),
        glide(position.y, velocity.y, actor.last_velocity.y),
    )
}

/// Keeps a stopping actor drifting until it rests on a whole pixel.
fn glide(position: f32, velocity: f32, last: f32) -> f32 {
    if velocity != 0.0 || last == 0.0 || position.fract() == 0.0 {
        return velocity;
    }
    let trial = position + last;
    if last < 0.0 {
        let boundary = position.floor();
        if trial <= boundary {
            return boundary - position;
        }
    } else {
        let boundary = position.ceil();
        if trial >= boundary {
            return boundary - position;
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::ecs::{CollisionInteraction, Direction, Hitbox, PlayerControlled};
    use crate::script::testing::RecordingHost;
    use crate::script::{MapCommand, ScriptMode};

    struct Harness {
        world: World,
        scripts: ScriptEngine,
        host: RecordingHost,
        resolver: MovementResolver,
    }

    impl Harness {
        fn new() -> Self {
            let world = World::new(WorldConfig::default(), Rect::new(0.0, 0.0, 256.0, 256.0))
                .expect("world");
            Self {
                world,
                scripts: ScriptEngine::new(),
                host: RecordingHost::default(),
                resolver: MovementResolver::new(),
            }
        }

        fn frame(&mut self, dt: f32) -> MovementStats {
            let stats = self
                .resolver
                .process(dt, &mut self.world, &mut self.scripts, &mut self.host);
            self.resolver.post_process(&mut self.world);
            stats
        }

        fn actor(&mut self, position: Vec2, size: f32, speed: f32) -> Entity {
            let entity = self.world.spawn(position).expect("entity");
            self.world.components.actors.add(entity, Actor::new(speed));
            let rect = Rect::new(position.x, position.y, size, size);
            self.world.attach_hitbox(entity, Hitbox::solid(rect));
            entity
        }

        fn walk(&mut self, entity: Entity, direction: Direction) {
            let actor = self.world.components.actors.get_mut(entity).expect("actor");
            actor.direction = direction;
            actor.moving = direction != Direction::None;
        }

        fn position(&self, entity: Entity) -> Vec2 {
            *self.world.components.positions.get(entity).expect("position")
        }

        fn plate(&mut self, rect: Rect, command: MapCommand, mode: InteractionMode) -> Entity {
            let entity = self.world.spawn(rect.origin()).expect("plate");
            self.world.attach_hitbox(entity, Hitbox::soft(rect));
            self.world
                .components
                .interactions
                .add(entity, CollisionInteraction::new(command, mode));
            entity
        }
    }

    #[test]
    fn glide_snaps_to_whole_pixel_after_stopping() {
        let mut h = Harness::new();
        let e = h.world.spawn(Vec2::new(10.75, 4.0)).expect("entity");
        h.world.components.actors.add(e, Actor::new(1.0));

        h.walk(e, Direction::Left);
        h.frame(0.25);
        assert_eq!(h.position(e), Vec2::new(10.5, 4.0));

        h.walk(e, Direction::None);
        h.frame(0.25);
        assert_eq!(h.position(e), Vec2::new(10.25, 4.0));
        h.frame(0.25);
        assert_eq!(h.position(e), Vec2::new(10.0, 4.0));
        h.frame(0.25);
        assert_eq!(h.position(e), Vec2::new(10.0, 4.0));
        let actor = h.world.components.actors.get(e).expect("actor");
        assert!(actor.last_velocity.is_zero());
    }

    #[test]
    fn glide_carries_velocity_until_boundary() {
        assert_eq!(glide(10.75, 0.0, -0.25), -0.25);
        assert_eq!(glide(10.5, 0.0, -0.5), -0.5);
        assert_eq!(glide(10.5, 0.0, 0.75), 0.5);
        assert_eq!(glide(10.0, 0.0, -1.0), 0.0);
        assert_eq!(glide(10.5, 2.0, -1.0), 2.0);
    }

    #[test]
    fn solid_actor_stops_at_wall_without_tunnelling() {
        let mut h = Harness::new();
        let mover = h.actor(Vec2::new(16.0, 0.0), 16.0, 60.0);
        let wall = h.world.spawn(Vec2::new(32.0, 0.0)).expect("wall");
        h.world
            .attach_hitbox(wall, Hitbox::solid(Rect::new(32.0, 0.0, 16.0, 16.0)));

        h.walk(mover, Direction::Right);
        let stats = h.frame(0.1);
        assert_eq!(h.position(mover), Vec2::new(16.0, 0.0));
        assert_eq!(stats.collisions_resolved, 1);
        let hitbox = h.world.components.hitboxes.get(mover).expect("hitbox");
        assert_eq!(hitbox.rect, Rect::new(16.0, 0.0, 16.0, 16.0));
    }

    #[test]
    fn soft_bodied_actor_is_blocked_by_tile_walls() {
        let mut h = Harness::new();
        h.world.tiles.add_rect(0, Rect::new(32.0, 0.0, 16.0, 16.0));
        let mover = h.world.spawn(Vec2::new(16.0, 0.0)).expect("entity");
        h.world.components.actors.add(mover, Actor::new(100.0));
        h.world
            .attach_hitbox(mover, Hitbox::soft(Rect::new(16.0, 0.0, 16.0, 16.0)));

        h.walk(mover, Direction::Right);
        for _ in 0..3 {
            h.frame(0.1);
        }
        let rect = h.world.components.hitboxes.get(mover).expect("hitbox").rect;
        assert_eq!(rect, Rect::new(16.0, 0.0, 16.0, 16.0));
        assert!(h.world.tiles.query(0, &rect).is_empty());
        assert_eq!(h.position(mover), Vec2::new(16.0, 0.0));
    }

    #[test]
    fn stationary_actor_is_pushed_out_of_solid_overlap() {
        let mut h = Harness::new();
        let actor = h.actor(Vec2::new(10.0, 0.0), 16.0, 60.0);
        let wall = h.world.spawn(Vec2::new(20.0, 0.0)).expect("wall");
        h.world
            .attach_hitbox(wall, Hitbox::solid(Rect::new(20.0, 0.0, 16.0, 16.0)));

        let stats = h.frame(0.1);
        assert_eq!(stats.collisions_resolved, 1);
        assert_eq!(stats.collisions_unresolved, 0);
        assert_eq!(h.position(actor), Vec2::new(4.0, 0.0));
        let rect = h.world.components.hitboxes.get(actor).expect("hitbox").rect;
        let mut hits = Vec::new();
        h.world
            .spatial
            .query_into(0, BodyKind::Solid, &rect, Some(actor), &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn resolution_without_overlaps_changes_nothing() {
        let mut h = Harness::new();
        let mover = h.actor(Vec2::new(40.0, 40.0), 16.0, 60.0);
        let other = h.actor(Vec2::new(100.0, 40.0), 16.0, 60.0);
        let before = *h.world.components.hitboxes.get(mover).expect("hitbox");

        for _ in 0..3 {
            let stats = h.frame(0.1);
            assert_eq!(stats, MovementStats::default());
        }
        assert_eq!(*h.world.components.hitboxes.get(mover).expect("hitbox"), before);
        assert_eq!(h.position(other), Vec2::new(100.0, 40.0));

        let mut stats = MovementStats::default();
        let probe = before.rect.translated(Vec2::new(3.0, 0.0));
        let resolved = h.resolver.resolve_solids(&h.world, mover, 0, probe, &mut stats);
        assert_eq!(resolved, probe);
        assert_eq!(stats.collisions_resolved, 0);
    }

    #[test]
    fn tile_walls_block_movement() {
        let mut h = Harness::new();
        h.world.tiles.add_rect(0, Rect::new(0.0, 32.0, 64.0, 16.0));
        let mover = h.actor(Vec2::new(8.0, 10.0), 16.0, 100.0);
        h.walk(mover, Direction::Down);
        h.frame(0.1);
        assert_eq!(h.position(mover), Vec2::new(8.0, 16.0));
    }

    #[test]
    fn uncapped_tile_resolution_leaves_no_overlap() {
        let config = WorldConfig {
            max_tile_collision_attempts: None,
            ..WorldConfig::default()
        };
        let mut h = Harness::new();
        h.world = World::new(config, Rect::new(0.0, 0.0, 256.0, 256.0)).expect("world");
        h.world.tiles.add_rect(0, Rect::new(48.0, 0.0, 16.0, 64.0));
        let mover = h.actor(Vec2::new(30.0, 20.0), 16.0, 100.0);
        h.walk(mover, Direction::Right);
        h.frame(0.1);
        let rect = h.world.components.hitboxes.get(mover).expect("hitbox").rect;
        assert!(h.world.tiles.query(0, &rect).is_empty());
        assert_eq!(h.position(mover), Vec2::new(32.0, 20.0));
    }

    #[test]
    fn sprinting_scales_speed() {
        let mut h = Harness::new();
        let e = h.world.spawn(Vec2::ZERO).expect("entity");
        let mut actor = Actor::new(10.0);
        actor.moving_direction = Direction::Right;
        actor.sprinting = true;
        h.world.components.actors.add(e, actor);
        h.frame(1.0);
        assert_eq!(h.position(e), Vec2::new(20.0, 0.0));
        assert_eq!(
            h.world.components.actors.get(e).expect("actor").moving_direction,
            Direction::None
        );
    }

    #[test]
    fn pressure_plate_fires_once_per_overlap() {
        let mut h = Harness::new();
        h.plate(
            Rect::new(32.0, 0.0, 16.0, 16.0),
            MapCommand::DisableControls,
            InteractionMode::PressurePlate,
        );
        let player = h.actor(Vec2::new(30.0, 0.0), 8.0, 10.0);
        h.world.components.players.add(player, PlayerControlled);

        let fired = |h: &mut Harness| h.frame(0.1).interactions_fired;
        assert_eq!(fired(&mut h), 1);
        assert!(!h.world.controls_enabled);
        h.world.controls_enabled = true;
        for _ in 0..5 {
            assert_eq!(fired(&mut h), 0);
        }
        assert!(h.world.controls_enabled);

        h.world.place_entity(player, Vec2::new(0.0, 0.0));
        assert_eq!(fired(&mut h), 0);
        h.world.place_entity(player, Vec2::new(36.0, 4.0));
        assert_eq!(fired(&mut h), 1);
        assert!(!h.world.controls_enabled);
    }

    #[test]
    fn continuous_interaction_fires_every_frame() {
        let mut h = Harness::new();
        h.plate(
            Rect::new(0.0, 0.0, 32.0, 32.0),
            MapCommand::EnableControls,
            InteractionMode::Continuous,
        );
        h.actor(Vec2::new(8.0, 8.0), 8.0, 10.0);
        for _ in 0..3 {
            assert_eq!(h.frame(0.1).interactions_fired, 1);
        }
    }

    #[test]
    fn fleeting_interaction_frees_its_entity() {
        let mut h = Harness::new();
        let pickup = h.plate(
            Rect::new(20.0, 0.0, 8.0, 8.0),
            MapCommand::activate_script("collected"),
            InteractionMode::Fleeting,
        );
        h.host = RecordingHost::default()
            .with_script("collected", vec![MapCommand::speak(None, "Got it")]);
        let mover = h.actor(Vec2::new(10.0, 0.0), 8.0, 40.0);
        h.walk(mover, Direction::Right);

        let stats = h.frame(0.1);
        assert_eq!(stats.interactions_fired, 1);
        assert_eq!(stats.entities_freed, 1);
        assert!(!h.world.is_alive(pickup));
        assert!(!h.world.components.has_any(pickup));
        assert_eq!(h.scripts.mode(), ScriptMode::Cutscene);
        assert!(h
            .world
            .spatial
            .query(0, BodyKind::Soft, &Rect::new(0.0, 0.0, 256.0, 256.0), None)
            .is_empty());
    }
}
