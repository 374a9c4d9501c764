pub mod camera;
pub mod config;
pub mod ecs;
pub mod geometry;
pub mod input;
pub mod movement;
pub mod script;
pub mod simulation;
pub mod spatial;
pub mod tiles;
pub mod world;

pub use camera::{step_toward, Camera};
pub use config::{ConfigError, WorldConfig};
pub use ecs::{
    Actor, BodyKind, CollisionInteraction, ComponentStore, Components, Direction, Entity,
    EntityRegistry, Hitbox, InteractionMode, MapLayer, PlayerControlled, MAX_ENTITIES,
};
pub use geometry::{minimum_translation, Rect, Vec2};
pub use input::{ActionStates, InputAction, PlayerInput};
pub use movement::{MovementResolver, MovementStats};
pub use script::{MapCommand, MapCommandList, ScriptEngine, ScriptHost, ScriptMode};
pub use simulation::{FrameStats, Simulation};
pub use spatial::{QuadTree, SpatialHit, SpatialIndex};
pub use tiles::{TileCollisionMap, Tilemap, TilemapError};
pub use world::World;
