use thiserror::Error;
use tileworld_engine::{
    Actor, CollisionInteraction, ConfigError, Entity, FrameStats, Hitbox, InteractionMode,
    MapCommand, MapCommandList, PlayerControlled, Rect, ScriptMode, Simulation,
    TileCollisionMap, Tilemap, TilemapError, Vec2, World, WorldConfig,
};
use tracing::{info, warn};

use super::host::DemoHost;
use super::scenario::Scenario;

pub(crate) const HALL: &str = "hall";
pub(crate) const CELLAR: &str = "cellar";

const TILE_SIZE: f32 = 16.0;
const FLOOR: u16 = 0;
const WALL: u16 = 1;
const PLAYER_SIZE: f32 = 12.0;
const PLAYER_SPEED: f32 = 64.0;
const GUIDE_SPEED: f32 = 40.0;
const WORLD_AREA: Rect = Rect::new(0.0, 0.0, 320.0, 192.0);

#[derive(Debug, Error)]
pub(crate) enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tilemap(#[from] TilemapError),
    #[error("entity pool exhausted while building map {map}")]
    PoolExhausted { map: &'static str },
    #[error("unknown map {0}")]
    UnknownMap(String),
}

/// The two demo maps driven by a scripted scenario.
#[derive(Debug)]
pub(crate) struct DemoSession {
    sim: Simulation,
    host: DemoHost,
    scenario: Scenario,
    map: &'static str,
    elapsed_seconds: f32,
}

impl DemoSession {
    pub(crate) fn new(config: WorldConfig, scenario: Scenario) -> Result<Self, DemoError> {
        let world = World::new(config, WORLD_AREA)?;
        let host = DemoHost::new(scenario.scripts.clone(), scenario.dialogue_seconds);
        let mut session = Self {
            sim: Simulation::new(world),
            host,
            scenario,
            map: HALL,
            elapsed_seconds: 0.0,
        };
        session.load_map(HALL, None)?;
        Ok(session)
    }

    pub(crate) fn map(&self) -> &'static str {
        self.map
    }

    pub(crate) fn elapsed_seconds(&self) -> f32 {
        self.elapsed_seconds
    }

    pub(crate) fn transcript(&self) -> &[String] {
        self.host.transcript()
    }

    pub(crate) fn step(&mut self, dt: f32) -> FrameStats {
        let input = self.scenario.input_at(self.elapsed_seconds);
        self.host.advance(dt);
        let stats = self.sim.tick(dt, &input, &mut self.host);
        self.elapsed_seconds += dt;

        if let Some(switch) = self.host.take_map_switch() {
            if let Err(err) = self.load_map(&switch.map, switch.spawn.as_deref()) {
                warn!(error = %err, map = %switch.map, "map_switch_failed");
            }
        }
        stats
    }

    fn load_map(&mut self, map: &str, spawn: Option<&str>) -> Result<(), DemoError> {
        let map = match map {
            HALL => HALL,
            CELLAR => CELLAR,
            other => return Err(DemoError::UnknownMap(other.to_owned())),
        };
        if self.sim.scripts.mode() == ScriptMode::Cutscene {
            self.sim.scripts.cancel_cutscene();
        }

        let world = &mut self.sim.world;
        world.clear();
        if map == HALL {
            build_hall(world, &self.scenario, spawn)?;
        } else {
            build_cellar(world, spawn)?;
        }
        world.update_camera();
        self.map = map;
        info!(map, spawn = ?spawn, entities = world.live_count(), "map_loaded");
        Ok(())
    }
}

fn build_hall(world: &mut World, scenario: &Scenario, spawn: Option<&str>) -> Result<(), DemoError> {
    let mut tiles = walled_tilemap(20, 12);
    // pillar below the plate
    tiles[8 * 20 + 6] = WALL;
    tiles[8 * 20 + 7] = WALL;
    let tilemap = Tilemap::new(20, 12, Vec2::ZERO, TILE_SIZE, tiles)?;
    world.tiles = TileCollisionMap::from_tilemap(0, &tilemap, &[WALL]);

    let start = match spawn {
        Some("door_return") => Vec2::new(240.0, 80.0),
        _ => Vec2::new(32.0, 80.0),
    };
    spawn_player(world, HALL, start)?;

    let guide = spawn_in(world, HALL, Vec2::new(96.0, 48.0))?;
    world.components.actors.add(guide, Actor::new(GUIDE_SPEED));
    world.attach_hitbox(
        guide,
        Hitbox::solid(Rect::new(96.0, 48.0, PLAYER_SIZE, PLAYER_SIZE)),
    );
    world
        .components
        .command_lists
        .add(guide, MapCommandList::new(scenario.patrol.clone()));

    spawn_trigger(
        world,
        HALL,
        Rect::new(96.0, 80.0, 16.0, 16.0),
        MapCommand::activate_script("plate"),
        InteractionMode::PressurePlate,
    )?;
    spawn_trigger(
        world,
        HALL,
        Rect::new(48.0, 64.0, 16.0, 48.0),
        MapCommand::activate_script("intro"),
        InteractionMode::Fleeting,
    )?;
    for x in [144.0, 176.0, 208.0] {
        spawn_trigger(
            world,
            HALL,
            Rect::new(x, 84.0, 8.0, 8.0),
            MapCommand::activate_script("pickup"),
            InteractionMode::Fleeting,
        )?;
    }
    spawn_trigger(
        world,
        HALL,
        Rect::new(272.0, 80.0, 16.0, 16.0),
        MapCommand::SwitchMap {
            map: CELLAR.to_owned(),
            spawn: Some("stairs".to_owned()),
        },
        InteractionMode::PressurePlate,
    )?;
    Ok(())
}

fn build_cellar(world: &mut World, spawn: Option<&str>) -> Result<(), DemoError> {
    let tilemap = Tilemap::new(12, 10, Vec2::ZERO, TILE_SIZE, walled_tilemap(12, 10))?;
    world.tiles = TileCollisionMap::from_tilemap(0, &tilemap, &[WALL]);

    if spawn != Some("stairs") {
        warn!(spawn = ?spawn, "cellar_spawn_defaulted");
    }
    spawn_player(world, CELLAR, Vec2::new(32.0, 32.0))?;
    spawn_trigger(
        world,
        CELLAR,
        Rect::new(160.0, 128.0, 16.0, 16.0),
        MapCommand::SwitchMap {
            map: HALL.to_owned(),
            spawn: Some("door_return".to_owned()),
        },
        InteractionMode::PressurePlate,
    )?;
    Ok(())
}

fn walled_tilemap(width: u32, height: u32) -> Vec<u16> {
    let mut tiles = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let edge = x == 0 || y == 0 || x == width - 1 || y == height - 1;
            tiles.push(if edge { WALL } else { FLOOR });
        }
    }
    tiles
}

fn spawn_in(world: &mut World, map: &'static str, position: Vec2) -> Result<Entity, DemoError> {
    world
        .spawn(position)
        .ok_or(DemoError::PoolExhausted { map })
}

fn spawn_player(world: &mut World, map: &'static str, position: Vec2) -> Result<Entity, DemoError> {
    let player = spawn_in(world, map, position)?;
    world.components.actors.add(player, Actor::new(PLAYER_SPEED));
    world.components.players.add(player, PlayerControlled);
    world.attach_hitbox(
        player,
        Hitbox::solid(Rect::new(position.x, position.y, PLAYER_SIZE, PLAYER_SIZE)),
    );
    world.camera.follow(player);
    Ok(player)
}

fn spawn_trigger(
    world: &mut World,
    map: &'static str,
    area: Rect,
    command: MapCommand,
    mode: InteractionMode,
) -> Result<Entity, DemoError> {
    let trigger = spawn_in(world, map, area.origin())?;
    world.attach_hitbox(trigger, Hitbox::soft(area));
    world
        .components
        .interactions
        .add(trigger, CollisionInteraction::new(command, mode));
    Ok(trigger)
}
