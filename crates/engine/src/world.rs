use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::config::{ConfigError, WorldConfig};
use crate::ecs::{Components, Entity, EntityRegistry, Hitbox, MapLayer};
use crate::geometry::{Rect, Vec2};
use crate::spatial::SpatialIndex;
use crate::tiles::TileCollisionMap;

/// Entity registry, component stores and the spatial/tile indexes that must
/// stay consistent with them.
///
/// Hitbox rectangles are stored in world space. Code that moves an entity
/// with a hitbox should go through [`World::place_entity`] so the spatial
/// index follows.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    registry: EntityRegistry,
    pub components: Components,
    pub spatial: SpatialIndex,
    pub tiles: TileCollisionMap,
    pub camera: Camera,
    pub controls_enabled: bool,
}

impl World {
    pub fn new(config: WorldConfig, area: Rect) -> Result<Self, ConfigError> {
        config.validate()?;
        let spatial = SpatialIndex::new(
            area,
            1,
            config.quadtree_threshold,
            config.min_subdivision_size,
        );
        Ok(Self {
            registry: EntityRegistry::with_capacity(config.entity_capacity),
            components: Components::default(),
            spatial,
            tiles: TileCollisionMap::default(),
            camera: Camera::default(),
            controls_enabled: true,
            config,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn live_count(&self) -> usize {
        self.registry.live_count()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.registry.is_alive(entity)
    }

    pub fn create_entity(&mut self) -> Option<Entity> {
        self.registry.create_entity()
    }

    /// Creates an entity with a position.
    pub fn spawn(&mut self, position: Vec2) -> Option<Entity> {
        let entity = self.create_entity()?;
        self.components.positions.add(entity, position);
        Some(entity)
    }

    /// Strips `entity` from the spatial index and every component store,
    /// then recycles its id.
    pub fn free_entity(&mut self, entity: Entity) -> bool {
        if !self.registry.is_alive(entity) {
            warn!(entity = entity.raw(), "entity_free_not_alive");
            return false;
        }
        if let Some(hitbox) = self.components.hitboxes.get(entity).copied() {
            let layer = self.components.layer_of(entity);
            self.spatial.remove(layer, &hitbox, entity);
        }
        if self.camera.following() == Some(entity) {
            self.camera.stop_following();
        }
        self.components.strip(entity);
        debug!(entity = entity.raw(), "entity_freed");
        self.registry.release(entity)
    }

    /// Adds a world-space hitbox and indexes it on the entity's layer.
    pub fn attach_hitbox(&mut self, entity: Entity, hitbox: Hitbox) -> bool {
        if !self.components.hitboxes.add(entity, hitbox) {
            return false;
        }
        let layer = self.components.layer_of(entity);
        self.spatial.insert(layer, &hitbox, entity);
        true
    }

    /// Moves an entity, carrying its hitbox and spatial entry along.
    pub fn place_entity(&mut self, entity: Entity, position: Vec2) -> bool {
        let layer = self.components.layer_of(entity);
        let Some(current) = self.components.positions.get_mut(entity) else {
            warn!(entity = entity.raw(), "place_entity_missing_position");
            return false;
        };
        let delta = position - *current;
        *current = position;
        if let Some(hitbox) = self.components.hitboxes.get_mut(entity) {
            let before = hitbox.rect;
            hitbox.rect = before.translated(delta);
            self.spatial
                .relocate(layer, hitbox.body, &before, &hitbox.rect, entity);
        }
        true
    }

    pub fn set_layer(&mut self, entity: Entity, layer: u8) {
        let previous = self.components.layer_of(entity);
        if let Some(current) = self.components.layers.get_mut(entity) {
            current.0 = layer;
        } else {
            self.components.layers.add(entity, MapLayer(layer));
        }
        if previous == layer {
            return;
        }
        if let Some(hitbox) = self.components.hitboxes.get(entity).copied() {
            self.spatial.remove(previous, &hitbox, entity);
            self.spatial.insert(layer, &hitbox, entity);
        }
    }

    pub fn player(&self) -> Option<Entity> {
        self.components.player()
    }

    /// Hitbox centre, else the entity's position.
    pub fn focus_point(&self, entity: Entity) -> Option<Vec2> {
        self.components
            .hitboxes
            .get(entity)
            .map(|hitbox| hitbox.rect.center())
            .or_else(|| self.components.positions.get(entity).copied())
    }

    pub fn update_camera(&mut self) {
        let focus = self
            .camera
            .following()
            .and_then(|entity| self.focus_point(entity));
        self.camera.update_follow(focus);
    }

    pub fn rebuild_spatial(&mut self) {
        self.spatial.rebuild(&self.components);
    }

    /// Drops every entity and all static collision, ready for a new map.
    pub fn clear(&mut self) {
        let entities = self.registry.live_count();
        self.components.remove_all();
        self.registry.clear();
        self.spatial.reset();
        self.tiles = TileCollisionMap::default();
        self.camera.stop_following();
        self.controls_enabled = true;
        info!(entities, "world_cleared");
    }
}
