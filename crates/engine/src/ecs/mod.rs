mod components;
mod entity;
mod store;

pub use components::{
    Actor, BodyKind, CollisionInteraction, Components, Direction, Hitbox, InteractionMode,
    MapLayer, PlayerControlled,
};
pub use entity::{Entity, EntityRegistry, MAX_ENTITIES};
pub use store::ComponentStore;
