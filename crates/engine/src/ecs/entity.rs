use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Size of the entity pool. Raw value `MAX_ENTITIES` itself is the sentinel.
pub const MAX_ENTITIES: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u8);

impl Entity {
    /// Reserved "no entity" value. Never issued by [`EntityRegistry`].
    pub const NONE: Entity = Entity(u8::MAX);

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_none(self) -> bool {
        self.0 == u8::MAX
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "entity(none)")
        } else {
            write!(f, "entity({})", self.0)
        }
    }
}

#[derive(Debug)]
pub struct EntityRegistry {
    capacity: usize,
    high_water_mark: usize,
    free_list: Vec<Entity>,
    alive: [bool; MAX_ENTITIES],
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }
}

impl EntityRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.min(MAX_ENTITIES),
            high_water_mark: 0,
            free_list: Vec::new(),
            alive: [false; MAX_ENTITIES],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn live_count(&self) -> usize {
        self.high_water_mark - self.free_list.len()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        !entity.is_none() && self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Fresh ids come from the high-water mark first; recycled ids are reused
    /// LIFO once the pool has been walked once.
    pub fn create_entity(&mut self) -> Option<Entity> {
        let entity = if self.high_water_mark < self.capacity {
            let entity = Entity(self.high_water_mark as u8);
            self.high_water_mark += 1;
            entity
        } else if let Some(recycled) = self.free_list.pop() {
            recycled
        } else {
            warn!(capacity = self.capacity, "entity_pool_exhausted");
            return None;
        };
        self.alive[entity.index()] = true;
        Some(entity)
    }

    /// Returns the id to the free list. Callers must strip component data
    /// first; `World::free_entity` does both.
    pub fn release(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            warn!(entity = entity.raw(), "entity_free_not_alive");
            return false;
        }
        self.alive[entity.index()] = false;
        self.free_list.push(entity);
        true
    }

    pub fn clear(&mut self) {
        self.high_water_mark = 0;
        self.free_list.clear();
        self.alive = [false; MAX_ENTITIES];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_issue_from_high_water_mark_then_free_list() {
        let mut registry = EntityRegistry::with_capacity(3);
        let a = registry.create_entity().expect("a");
        let b = registry.create_entity().expect("b");
        assert_eq!((a.raw(), b.raw()), (0, 1));

        assert!(registry.release(a));
        let c = registry.create_entity().expect("c");
        assert_eq!(c.raw(), 2, "high-water mark is used before recycling");

        let d = registry.create_entity().expect("d");
        assert_eq!(d, a);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut registry = EntityRegistry::with_capacity(3);
        let ids: Vec<_> = (0..3).map(|_| registry.create_entity().expect("id")).collect();
        registry.release(ids[0]);
        registry.release(ids[2]);
        assert_eq!(registry.create_entity(), Some(ids[2]));
        assert_eq!(registry.create_entity(), Some(ids[0]));
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let mut registry = EntityRegistry::with_capacity(2);
        assert!(registry.create_entity().is_some());
        assert!(registry.create_entity().is_some());
        assert_eq!(registry.create_entity(), None);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn double_release_is_rejected() {
        let mut registry = EntityRegistry::default();
        let e = registry.create_entity().expect("entity");
        assert!(registry.release(e));
        assert!(!registry.release(e));
        assert!(!registry.release(Entity::NONE));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn capacity_is_clamped_to_pool_size() {
        let registry = EntityRegistry::with_capacity(10_000);
        assert_eq!(registry.capacity(), MAX_ENTITIES);
    }
}
