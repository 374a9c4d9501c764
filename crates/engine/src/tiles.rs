use thiserror::Error;
use tracing::debug;

use crate::geometry::{Rect, Vec2};

/// Tilemap origin convention:
/// - `origin` is the world position of tile (0,0) top-left corner.
/// - Tile (x,y) covers `origin + (x, y) * tile_size` to one tile further on
///   both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    origin: Vec2,
    tile_size: f32,
    tiles: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("tile size must be positive and finite, got {0}")]
    InvalidTileSize(f32),
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        origin: Vec2,
        tile_size: f32,
        tiles: Vec<u16>,
    ) -> Result<Self, TilemapError> {
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(TilemapError::InvalidTileSize(tile_size));
        }
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            origin,
            tile_size,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u16> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn tile_rect(&self, x: u32, y: u32) -> Option<Rect> {
        self.index_of(x, y)?;
        Some(Rect::new(
            self.origin.x + x as f32 * self.tile_size,
            self.origin.y + y as f32 * self.tile_size,
            self.tile_size,
            self.tile_size,
        ))
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.origin.x,
            self.origin.y,
            self.width as f32 * self.tile_size,
            self.height as f32 * self.tile_size,
        )
    }
}

/// Static blocking rectangles per map layer.
#[derive(Debug, Clone, Default)]
pub struct TileCollisionMap {
    layers: Vec<Vec<Rect>>,
}

impl TileCollisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tilemap(layer: u8, tilemap: &Tilemap, blocked: &[u16]) -> Self {
        let mut map = Self::new();
        map.set_layer_from_tilemap(layer, tilemap, blocked);
        map
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, layer: u8) -> &[Rect] {
        self.layers
            .get(layer as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn layer_mut(&mut self, layer: u8) -> &mut Vec<Rect> {
        if self.layers.len() <= layer as usize {
            self.layers.resize_with(layer as usize + 1, Vec::new);
        }
        &mut self.layers[layer as usize]
    }

    pub fn add_rect(&mut self, layer: u8, rect: Rect) {
        self.layer_mut(layer).push(rect);
    }

    /// Replaces a layer with the blocked tiles of `tilemap`. Horizontal runs
    /// of blocked tiles collapse into one rectangle so actors sliding along a
    /// wall never catch on the seam between two tiles.
    pub fn set_layer_from_tilemap(&mut self, layer: u8, tilemap: &Tilemap, blocked: &[u16]) {
        let rects = self.layer_mut(layer);
        rects.clear();
        for y in 0..tilemap.height() {
            let mut run: Option<Rect> = None;
            for x in 0..tilemap.width() {
                let is_blocked = tilemap
                    .tile_at(x, y)
                    .is_some_and(|tile| blocked.contains(&tile));
                if !is_blocked {
                    rects.extend(run.take());
                } else if let Some(open) = run.as_mut() {
                    open.w += tilemap.tile_size();
                } else {
                    run = tilemap.tile_rect(x, y);
                }
            }
            rects.extend(run);
        }
        debug!(layer, rects = rects.len(), "tile_collision_layer_built");
    }

    pub fn query_into(&self, layer: u8, rect: &Rect, out: &mut Vec<Rect>) {
        out.extend(self.layer(layer).iter().filter(|tile| tile.overlaps(rect)));
    }

    pub fn query(&self, layer: u8, rect: &Rect) -> Vec<Rect> {
        let mut out = Vec::new();
        self.query_into(layer, rect, &mut out);
        out
    }
}
