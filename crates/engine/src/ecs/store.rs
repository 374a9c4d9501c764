use tracing::warn;

use super::entity::{Entity, MAX_ENTITIES};

const ABSENT: usize = usize::MAX;

/// Sparse-set storage for one component type.
///
/// `sparse` maps an entity index to a slot in the two parallel dense arrays;
/// every contained entity satisfies `dense[sparse[e]] == e`. Removal swaps the
/// last slot into the hole, so dense order is only stable between mutations.
#[derive(Debug, Clone)]
pub struct ComponentStore<T, const CAPACITY: usize = MAX_ENTITIES> {
    sparse: Vec<usize>,
    dense: Vec<Entity>,
    values: Vec<T>,
    name: &'static str,
}

impl<T, const CAPACITY: usize> Default for ComponentStore<T, CAPACITY> {
    fn default() -> Self {
        Self::named(std::any::type_name::<T>())
    }
}

impl<T, const CAPACITY: usize> ComponentStore<T, CAPACITY> {
    pub fn named(name: &'static str) -> Self {
        Self {
            sparse: vec![ABSENT; CAPACITY],
            dense: Vec::new(),
            values: Vec::new(),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        match self.sparse.get(entity.index()) {
            Some(&slot) if slot != ABSENT => Some(slot),
            _ => None,
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns `false` without touching the store when `entity` is the
    /// sentinel, out of range, or already present.
    pub fn add(&mut self, entity: Entity, value: T) -> bool {
        if entity.is_none() || entity.index() >= CAPACITY {
            warn!(
                store = self.name,
                entity = entity.raw(),
                "component_add_invalid_entity"
            );
            return false;
        }
        if self.contains(entity) {
            warn!(store = self.name, entity = entity.raw(), "component_add_duplicate");
            return false;
        }
        self.sparse[entity.index()] = self.dense.len();
        self.dense.push(entity);
        self.values.push(value);
        true
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let Some(slot) = self.slot(entity) else {
            warn!(store = self.name, entity = entity.raw(), "component_remove_absent");
            return None;
        };
        self.sparse[entity.index()] = ABSENT;
        self.dense.swap_remove(slot);
        let value = self.values.swap_remove(slot);
        if let Some(&moved) = self.dense.get(slot) {
            self.sparse[moved.index()] = slot;
        }
        Some(value)
    }

    /// Silent variant used when stripping an entity from every store.
    pub(crate) fn discard(&mut self, entity: Entity) {
        if self.contains(entity) {
            self.remove(entity);
        }
    }

    pub fn remove_all(&mut self) {
        for entity in self.dense.drain(..) {
            self.sparse[entity.index()] = ABSENT;
        }
        self.values.clear();
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|slot| &self.values[slot])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slot(entity).map(|slot| &mut self.values[slot])
    }

    /// Lookup that falls back to the first stored value when `entity` is
    /// absent, logging the miss. Only `None` when the store is empty.
    pub fn get_or_first(&self, entity: Entity) -> Option<&T> {
        if let Some(value) = self.get(entity) {
            return Some(value);
        }
        warn!(
            store = self.name,
            entity = entity.raw(),
            "component_get_absent_fallback"
        );
        self.values.first()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.dense.iter().copied().zip(self.values.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(raw: u8) -> Entity {
        Entity::from_raw(raw)
    }

    fn assert_sparse_invariant<T, const N: usize>(store: &ComponentStore<T, N>) {
        for raw in 0..N as u8 {
            let entity = e(raw);
            let occurrences = store.entities().iter().filter(|&&d| d == entity).count();
            if store.contains(entity) {
                assert_eq!(occurrences, 1, "{entity} must appear exactly once");
                let slot = store.sparse[entity.index()];
                assert_eq!(store.entities()[slot], entity);
            } else {
                assert_eq!(occurrences, 0, "{entity} must not appear");
            }
        }
        assert_eq!(store.entities().len(), store.values().len());
    }

    #[test]
    fn add_get_remove() {
        let mut store: ComponentStore<i32> = ComponentStore::default();
        assert!(store.add(e(5), 50));
        assert!(store.add(e(10), 100));
        assert!(store.add(e(3), 30));

        assert_eq!(store.get(e(5)), Some(&50));
        assert_eq!(store.get(e(0)), None);
        assert_eq!(store.len(), 3);

        assert_eq!(store.remove(e(5)), Some(50));
        assert!(!store.contains(e(5)));
        assert_eq!(store.get(e(10)), Some(&100));
        assert_eq!(store.get(e(3)), Some(&30));
        assert_sparse_invariant(&store);
    }

    #[test]
    fn duplicate_and_sentinel_adds_are_rejected() {
        let mut store: ComponentStore<&str> = ComponentStore::default();
        assert!(store.add(e(1), "first"));
        assert!(!store.add(e(1), "second"));
        assert!(!store.add(Entity::NONE, "sentinel"));
        assert_eq!(store.get(e(1)), Some(&"first"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removing_absent_entity_is_a_no_op() {
        let mut store: ComponentStore<u32> = ComponentStore::default();
        store.add(e(2), 7);
        assert_eq!(store.remove(e(9)), None);
        assert_eq!(store.len(), 1);
        assert_sparse_invariant(&store);
    }

    #[test]
    fn invariant_holds_across_mixed_sequences() {
        let mut store: ComponentStore<u32, 16> = ComponentStore::default();
        let mut state = 0x2545_f491u32;
        for step in 0..500u32 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let entity = e((state % 16) as u8);
            if state & 0x100 == 0 {
                store.add(entity, step);
            } else {
                store.remove(entity);
            }
            assert_sparse_invariant(&store);
        }
    }

    #[test]
    fn get_or_first_falls_back_to_first_value() {
        let mut store: ComponentStore<u32> = ComponentStore::default();
        assert_eq!(store.get_or_first(e(0)), None);
        store.add(e(4), 40);
        store.add(e(6), 60);
        assert_eq!(store.get_or_first(e(6)), Some(&60));
        assert_eq!(store.get_or_first(e(9)), Some(&40));
    }

    #[test]
    fn remove_all_resets_sparse_entries() {
        let mut store: ComponentStore<u8> = ComponentStore::default();
        for raw in 0..10 {
            store.add(e(raw), raw);
        }
        store.remove_all();
        assert!(store.is_empty());
        assert!((0..10).all(|raw| !store.contains(e(raw))));
        assert!(store.add(e(3), 3));
        assert_sparse_invariant(&store);
    }

    #[test]
    fn iteration_pairs_entities_with_values() {
        let mut store: ComponentStore<u32> = ComponentStore::default();
        store.add(e(1), 10);
        store.add(e(2), 20);
        for (_, value) in store.iter_mut() {
            *value += 1;
        }
        let mut pairs: Vec<_> = store
            .iter()
            .map(|(entity, value)| (entity.raw(), *value))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(1, 11), (2, 21)]);
    }
}
