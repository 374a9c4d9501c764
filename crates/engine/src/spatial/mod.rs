mod index;
mod quadtree;

pub use index::SpatialIndex;
pub use quadtree::{QuadTree, SpatialHit, DEFAULT_MIN_SUBDIVISION_SIZE, DEFAULT_THRESHOLD};
