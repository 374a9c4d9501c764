use tracing::{debug, warn};

use crate::ecs::{BodyKind, Components, Entity, Hitbox};
use crate::geometry::Rect;

use super::quadtree::{QuadTree, SpatialHit};

#[derive(Debug)]
struct LayerTrees {
    solid: QuadTree,
    soft: QuadTree,
}

/// Solid and soft quadtrees for every map layer.
#[derive(Debug)]
pub struct SpatialIndex {
    area: Rect,
    threshold: usize,
    min_subdivision_size: f32,
    layers: Vec<LayerTrees>,
}

impl SpatialIndex {
    pub fn new(
        area: Rect,
        layer_count: usize,
        threshold: usize,
        min_subdivision_size: f32,
    ) -> Self {
        let mut index = Self {
            area,
            threshold,
            min_subdivision_size,
            layers: Vec::new(),
        };
        index.ensure_layer(layer_count.saturating_sub(1) as u8);
        index
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn ensure_layer(&mut self, layer: u8) {
        let (area, threshold, min_size) = (self.area, self.threshold, self.min_subdivision_size);
        while self.layers.len() <= layer as usize {
            debug!(layer = self.layers.len(), "spatial_layer_created");
            self.layers.push(LayerTrees {
                solid: QuadTree::with_limits(area, threshold, min_size),
                soft: QuadTree::with_limits(area, threshold, min_size),
            });
        }
    }

    pub fn tree(&self, layer: u8, body: BodyKind) -> Option<&QuadTree> {
        self.layers.get(layer as usize).map(|trees| match body {
            BodyKind::Solid => &trees.solid,
            BodyKind::Soft => &trees.soft,
        })
    }

    fn tree_mut(&mut self, layer: u8, body: BodyKind) -> &mut QuadTree {
        self.ensure_layer(layer);
        let trees = &mut self.layers[layer as usize];
        match body {
            BodyKind::Solid => &mut trees.solid,
            BodyKind::Soft => &mut trees.soft,
        }
    }

    pub fn insert(&mut self, layer: u8, hitbox: &Hitbox, entity: Entity) {
        self.tree_mut(layer, hitbox.body).insert(hitbox.rect, entity);
    }

    pub fn remove(&mut self, layer: u8, hitbox: &Hitbox, entity: Entity) -> bool {
        let removed = self.tree_mut(layer, hitbox.body).remove(&hitbox.rect, entity);
        if !removed {
            warn!(entity = entity.raw(), layer, "spatial_remove_missing");
        }
        removed
    }

    /// Moves an entity's entry so later queries in the same frame see it.
    pub fn relocate(
        &mut self,
        layer: u8,
        body: BodyKind,
        old: &Rect,
        new: &Rect,
        entity: Entity,
    ) {
        let tree = self.tree_mut(layer, body);
        tree.remove(old, entity);
        tree.insert(*new, entity);
    }

    pub fn query(
        &self,
        layer: u8,
        body: BodyKind,
        rect: &Rect,
        exclude: Option<Entity>,
    ) -> Vec<SpatialHit> {
        let mut out = Vec::new();
        self.query_into(layer, body, rect, exclude, &mut out);
        out
    }

    pub fn query_into(
        &self,
        layer: u8,
        body: BodyKind,
        rect: &Rect,
        exclude: Option<Entity>,
        out: &mut Vec<SpatialHit>,
    ) {
        if let Some(tree) = self.tree(layer, body) {
            tree.query_into(rect, exclude, out);
        }
    }

    pub fn reset(&mut self) {
        for trees in &mut self.layers {
            trees.solid.reset();
            trees.soft.reset();
        }
    }

    /// Rebuilds every tree from the current hitbox components.
    pub fn rebuild(&mut self, components: &Components) {
        self.reset();
        for (entity, hitbox) in components.hitboxes.iter() {
            let layer = components.layer_of(entity);
            self.insert(layer, hitbox, entity);
        }
        debug!(
            entries = components.hitboxes.len(),
            layers = self.layers.len(),
            "spatial_index_rebuilt"
        );
    }
}
