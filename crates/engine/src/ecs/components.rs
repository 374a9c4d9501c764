use std::f32::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Vec2};
use crate::script::{MapCommand, MapCommandList};

use super::entity::Entity;
use super::store::ComponentStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    /// Unit vector in world space (y grows downward); diagonals are normalized.
    pub fn unit_vector(self) -> Vec2 {
        let d = FRAC_1_SQRT_2;
        match self {
            Self::None => Vec2::ZERO,
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::UpLeft => Vec2::new(-d, -d),
            Self::UpRight => Vec2::new(d, -d),
            Self::DownLeft => Vec2::new(-d, d),
            Self::DownRight => Vec2::new(d, d),
        }
    }

    /// Direction from per-axis signs; any sign outside `-1..=1` is clamped.
    pub fn from_signs(sx: i8, sy: i8) -> Self {
        match (sx.signum(), sy.signum()) {
            (0, 0) => Self::None,
            (0, -1) => Self::Up,
            (0, _) => Self::Down,
            (-1, 0) => Self::Left,
            (_, 0) => Self::Right,
            (-1, -1) => Self::UpLeft,
            (_, -1) => Self::UpRight,
            (-1, _) => Self::DownLeft,
            _ => Self::DownRight,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Actor {
    pub speed: f32,
    pub direction: Direction,
    pub moving: bool,
    pub sprinting: bool,
    /// Per-frame intent from player input; cleared by the post-process pass.
    pub moving_direction: Direction,
    pub last_velocity: Vec2,
}

impl Actor {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    pub fn intended_direction(&self) -> Direction {
        if self.moving_direction != Direction::None {
            self.moving_direction
        } else if self.moving {
            self.direction
        } else {
            Direction::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Solid,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub rect: Rect,
    pub body: BodyKind,
}

impl Hitbox {
    pub fn solid(rect: Rect) -> Self {
        Self {
            rect,
            body: BodyKind::Solid,
        }
    }

    pub fn soft(rect: Rect) -> Self {
        Self {
            rect,
            body: BodyKind::Soft,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapLayer(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    PressurePlate,
    Continuous,
    Fleeting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionInteraction {
    pub command: MapCommand,
    pub mode: InteractionMode,
    pub active: bool,
    pub pressed: bool,
}

impl CollisionInteraction {
    pub fn new(command: MapCommand, mode: InteractionMode) -> Self {
        Self {
            command,
            mode,
            active: false,
            pressed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerControlled;

/// Every component store the world knows about.
#[derive(Debug)]
pub struct Components {
    pub positions: ComponentStore<Vec2>,
    pub hitboxes: ComponentStore<Hitbox>,
    pub actors: ComponentStore<Actor>,
    pub layers: ComponentStore<MapLayer>,
    pub command_lists: ComponentStore<MapCommandList>,
    pub interactions: ComponentStore<CollisionInteraction>,
    pub players: ComponentStore<PlayerControlled>,
}

impl Default for Components {
    fn default() -> Self {
        Self {
            positions: ComponentStore::named("position"),
            hitboxes: ComponentStore::named("hitbox"),
            actors: ComponentStore::named("actor"),
            layers: ComponentStore::named("layer"),
            command_lists: ComponentStore::named("command_list"),
            interactions: ComponentStore::named("interaction"),
            players: ComponentStore::named("player"),
        }
    }
}

impl Components {
    /// Drops `entity` from every store. New stores must be listed here.
    pub fn strip(&mut self, entity: Entity) {
        self.positions.discard(entity);
        self.hitboxes.discard(entity);
        self.actors.discard(entity);
        self.layers.discard(entity);
        self.command_lists.discard(entity);
        self.interactions.discard(entity);
        self.players.discard(entity);
    }

    pub fn has_any(&self, entity: Entity) -> bool {
        self.positions.contains(entity)
            || self.hitboxes.contains(entity)
            || self.actors.contains(entity)
            || self.layers.contains(entity)
            || self.command_lists.contains(entity)
            || self.interactions.contains(entity)
            || self.players.contains(entity)
    }

    pub fn remove_all(&mut self) {
        self.positions.remove_all();
        self.hitboxes.remove_all();
        self.actors.remove_all();
        self.layers.remove_all();
        self.command_lists.remove_all();
        self.interactions.remove_all();
        self.players.remove_all();
    }

    pub fn layer_of(&self, entity: Entity) -> u8 {
        self.layers.get(entity).map_or(0, |layer| layer.0)
    }

    pub fn player(&self) -> Option<Entity> {
        self.players.entities().first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_map_to_compass_directions() {
        assert_eq!(Direction::from_signs(0, 0), Direction::None);
        assert_eq!(Direction::from_signs(1, 0), Direction::Right);
        assert_eq!(Direction::from_signs(-1, -1), Direction::UpLeft);
        assert_eq!(Direction::from_signs(1, 1), Direction::DownRight);
        assert_eq!(Direction::from_signs(0, -3), Direction::Up);
    }

    #[test]
    fn diagonal_vectors_are_unit_length() {
        for direction in [
            Direction::UpLeft,
            Direction::UpRight,
            Direction::DownLeft,
            Direction::DownRight,
        ] {
            assert!((direction.unit_vector().length() - 1.0).abs() < 1e-6);
        }
        assert!(Direction::None.unit_vector().is_zero());
    }

    #[test]
    fn player_intent_overrides_scripted_direction() {
        let mut actor = Actor::new(60.0);
        assert_eq!(actor.intended_direction(), Direction::None);
        actor.direction = Direction::Left;
        actor.moving = true;
        assert_eq!(actor.intended_direction(), Direction::Left);
        actor.moving_direction = Direction::Up;
        assert_eq!(actor.intended_direction(), Direction::Up);
    }

    #[test]
    fn strip_clears_every_store() {
        let mut components = Components::default();
        let e = Entity::from_raw(3);
        components.positions.add(e, Vec2::new(1.0, 2.0));
        components.actors.add(e, Actor::new(10.0));
        components.players.add(e, PlayerControlled);
        components.layers.add(e, MapLayer(1));
        assert!(components.has_any(e));

        components.strip(e);
        assert!(!components.has_any(e));
    }
}
