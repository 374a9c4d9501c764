use tracing::debug;

use crate::ecs::Entity;
use crate::geometry::Rect;

pub const DEFAULT_THRESHOLD: usize = 6;
pub const DEFAULT_MIN_SUBDIVISION_SIZE: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialHit {
    pub entity: Entity,
    pub rect: Rect,
}

#[derive(Debug)]
enum QuadNode {
    Leaf { rect: Rect, entity: Entity },
    Branch(Branch),
}

#[derive(Debug)]
struct Branch {
    area: Rect,
    children: Vec<QuadNode>,
}

impl Branch {
    fn new(area: Rect) -> Self {
        Self {
            area,
            children: Vec::new(),
        }
    }

    fn insert(&mut self, rect: Rect, entity: Entity, threshold: usize, min_size: f32) {
        let descend = self.children.iter().position(
            |child| matches!(child, QuadNode::Branch(branch) if branch.area.contains_rect(&rect)),
        );
        if let Some(index) = descend {
            if let QuadNode::Branch(branch) = &mut self.children[index] {
                branch.insert(rect, entity, threshold, min_size);
            }
            return;
        }

        self.children.push(QuadNode::Leaf { rect, entity });
        if self.children.len() > threshold {
            self.merge(threshold, min_size);
            if self.children.len() > threshold {
                debug!(
                    children = self.children.len(),
                    threshold,
                    area_w = self.area.w,
                    area_h = self.area.h,
                    "quadtree_over_threshold"
                );
            }
        }
    }

    /// Pushes the leaves of the first quadrant holding at least two of them
    /// down into a branch for that quadrant. At most one quadrant per call.
    fn merge(&mut self, threshold: usize, min_size: f32) -> bool {
        for quadrant in self.area.quadrants() {
            if quadrant.w < min_size || quadrant.h < min_size {
                continue;
            }
            let contained = self
                .children
                .iter()
                .filter(|child| {
                    matches!(child, QuadNode::Leaf { rect, .. } if quadrant.contains_rect(rect))
                })
                .count();
            if contained < 2 {
                continue;
            }

            let mut moved = Vec::with_capacity(contained);
            let mut kept = Vec::with_capacity(self.children.len() - contained + 1);
            for child in self.children.drain(..) {
                match child {
                    QuadNode::Leaf { rect, entity } if quadrant.contains_rect(&rect) => {
                        moved.push((rect, entity));
                    }
                    other => kept.push(other),
                }
            }
            self.children = kept;

            let existing = self.children.iter().position(
                |child| matches!(child, QuadNode::Branch(branch) if branch.area == quadrant),
            );
            let index = match existing {
                Some(index) => index,
                None => {
                    self.children.push(QuadNode::Branch(Branch::new(quadrant)));
                    self.children.len() - 1
                }
            };
            if let QuadNode::Branch(branch) = &mut self.children[index] {
                for (rect, entity) in moved {
                    branch.insert(rect, entity, threshold, min_size);
                }
            }
            return true;
        }
        false
    }

    fn query_into(&self, rect: &Rect, exclude: Option<Entity>, out: &mut Vec<SpatialHit>) {
        for child in &self.children {
            match child {
                QuadNode::Leaf {
                    rect: leaf_rect,
                    entity,
                } => {
                    if Some(*entity) != exclude && leaf_rect.overlaps(rect) {
                        out.push(SpatialHit {
                            entity: *entity,
                            rect: *leaf_rect,
                        });
                    }
                }
                QuadNode::Branch(branch) => {
                    if branch.area.overlaps(rect) {
                        branch.query_into(rect, exclude, out);
                    }
                }
            }
        }
    }

    fn remove(&mut self, hint: Option<&Rect>, entity: Entity) -> bool {
        let leaf = self
            .children
            .iter()
            .position(|child| matches!(child, QuadNode::Leaf { entity: e, .. } if *e == entity));
        if let Some(index) = leaf {
            self.children.swap_remove(index);
            return true;
        }

        for index in 0..self.children.len() {
            let QuadNode::Branch(branch) = &mut self.children[index] else {
                continue;
            };
            if hint.is_some_and(|rect| !branch.area.contains_rect(rect)) {
                continue;
            }
            if branch.remove(hint, entity) {
                if branch.children.is_empty() {
                    self.children.swap_remove(index);
                }
                return true;
            }
        }
        false
    }
}

/// Dynamic quadtree over one map layer.
///
/// Leaves are pushed into a quadrant branch only once a node holds more than
/// `threshold` children, so sparse maps stay flat.
#[derive(Debug)]
pub struct QuadTree {
    root: Branch,
    threshold: usize,
    min_subdivision_size: f32,
    len: usize,
}

impl QuadTree {
    pub fn new(area: Rect) -> Self {
        Self::with_limits(area, DEFAULT_THRESHOLD, DEFAULT_MIN_SUBDIVISION_SIZE)
    }

    pub fn with_limits(area: Rect, threshold: usize, min_subdivision_size: f32) -> Self {
        Self {
            root: Branch::new(area),
            threshold: threshold.max(1),
            min_subdivision_size,
            len: 0,
        }
    }

    pub fn area(&self) -> Rect {
        self.root.area
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, rect: Rect, entity: Entity) {
        self.root
            .insert(rect, entity, self.threshold, self.min_subdivision_size);
        self.len += 1;
    }

    /// Removes the leaf for `entity`. `rect` should be the box it was inserted
    /// with; if that misses, the whole tree is searched.
    pub fn remove(&mut self, rect: &Rect, entity: Entity) -> bool {
        let removed = self.root.remove(Some(rect), entity) || {
            debug!(entity = entity.raw(), "quadtree_remove_hint_miss");
            self.root.remove(None, entity)
        };
        if removed {
            self.len -= 1;
        }
        removed
    }

    pub fn query(&self, rect: &Rect, exclude: Option<Entity>) -> Vec<SpatialHit> {
        let mut out = Vec::new();
        self.query_into(rect, exclude, &mut out);
        out
    }

    pub fn query_into(&self, rect: &Rect, exclude: Option<Entity>, out: &mut Vec<SpatialHit>) {
        self.root.query_into(rect, exclude, out);
    }

    pub fn reset(&mut self) {
        self.root.children.clear();
        self.len = 0;
    }
}
