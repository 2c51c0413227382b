//! Grid of equal-sized blocking tiles, the cheapest way to collide against
//! tile-based level geometry.

use glam::{IVec2, UVec2, Vec2};

use crate::api::DebugRenderer;
use crate::error::{CollisionError, CollisionResult};
use crate::geometry::Rect;
use crate::shapes::CollisionShape;
use crate::types::Color;

const MIN_TILE_SIZE: f32 = 1e-5;

/// Tilemap collision shape. Each occupied tile is a rect shape with its own
/// collision flags; an optional border collider surrounds the grid.
#[derive(Clone, Debug)]
pub struct TilemapShape {
    offset: Vec2,
    grid_size: UVec2,
    tile_size: Vec2,
    border_thickness: f32,
    inner: Rect,
    bounds: Rect,
    radius: f32,
    // Row-major, `y * width + x`.
    tiles: Vec<Option<CollisionShape>>,
}

impl TilemapShape {
    /// `offset` is the top-left corner of tile (0, 0).
    pub fn new(offset: Vec2, grid_size: UVec2, tile_size: Vec2, border_thickness: f32) -> Self {
        let tile_size = tile_size.max(Vec2::splat(MIN_TILE_SIZE));
        let border_thickness = border_thickness.max(0.0);
        let inner = Rect::new(
            offset.x,
            offset.y,
            grid_size.x as f32 * tile_size.x,
            grid_size.y as f32 * tile_size.y,
        );
        let bounds = inner.resize(Vec2::splat(border_thickness * 2.0));
        let cells = grid_size.x as usize * grid_size.y as usize;
        Self {
            offset,
            grid_size,
            tile_size,
            border_thickness,
            inner,
            bounds,
            radius: bounds.bounding_circle().radius,
            tiles: vec![None; cells],
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn grid_size(&self) -> UVec2 {
        self.grid_size
    }

    pub fn tile_size(&self) -> Vec2 {
        self.tile_size
    }

    pub fn border_thickness(&self) -> f32 {
        self.border_thickness
    }

    /// Area covered by tiles, without the border.
    pub fn inner_bounds(&self) -> Rect {
        self.inner
    }

    /// Inner bounds grown by the border on every side.
    pub fn bounding_box(&self) -> Rect {
        self.bounds
    }

    pub fn center(&self) -> Vec2 {
        self.bounds.center()
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn slot(&self, index: IVec2) -> Option<usize> {
        let in_range = index.x >= 0
            && index.y >= 0
            && (index.x as u32) < self.grid_size.x
            && (index.y as u32) < self.grid_size.y;
        in_range.then(|| index.y as usize * self.grid_size.x as usize + index.x as usize)
    }

    fn checked_slot(&self, index: IVec2) -> CollisionResult<usize> {
        self.slot(index).ok_or(CollisionError::TileOutOfBounds {
            x: index.x,
            y: index.y,
            width: self.grid_size.x,
            height: self.grid_size.y,
        })
    }

    /// Tile index containing a world position. May be outside the grid.
    pub fn index_at(&self, position: Vec2) -> IVec2 {
        ((position - self.offset) / self.tile_size).floor().as_ivec2()
    }

    /// Turn collision on or off for a tile. `flags` overrides the tile's
    /// collision flags when given; otherwise an existing tile keeps its flags
    /// and a new one matches everything.
    pub fn set_tile(
        &mut self,
        index: IVec2,
        has_collision: bool,
        flags: Option<u32>,
    ) -> CollisionResult<()> {
        let slot = self.checked_slot(index)?;
        if !has_collision {
            self.tiles[slot] = None;
            return Ok(());
        }
        let rect = Rect::new(
            self.offset.x + index.x as f32 * self.tile_size.x,
            self.offset.y + index.y as f32 * self.tile_size.y,
            self.tile_size.x,
            self.tile_size.y,
        );
        let tile = self.tiles[slot].get_or_insert_with(|| CollisionShape::rect(rect));
        if let Some(flags) = flags {
            tile.collision_flags = flags;
        }
        Ok(())
    }

    pub fn tile(&self, index: IVec2) -> CollisionResult<Option<&CollisionShape>> {
        let slot = self.checked_slot(index)?;
        Ok(self.tiles[slot].as_ref())
    }

    /// Occupied tile under a world position, if any.
    pub fn tile_at(&self, position: Vec2) -> Option<&CollisionShape> {
        let slot = self.slot(self.index_at(position))?;
        self.tiles[slot].as_ref()
    }

    /// Occupied tiles whose index range overlaps `region`, column by column.
    /// The far edge is inclusive, so a region ending exactly on a tile
    /// boundary also yields the next tile.
    pub fn tiles_in_region(&self, region: Rect) -> impl Iterator<Item = &CollisionShape> + '_ {
        let last = self.grid_size.as_ivec2() - IVec2::ONE;
        let start = self.index_at(region.min()).max(IVec2::ZERO);
        let end = self.index_at(region.max()).min(last);
        (start.x..=end.x)
            .flat_map(move |x| (start.y..=end.y).map(move |y| IVec2::new(x, y)))
            .filter_map(move |index| self.slot(index).and_then(|s| self.tiles[s].as_ref()))
    }

    /// Visit occupied tiles in `region`; return `false` to stop.
    pub fn iterate_tiles_at_region(
        &self,
        region: Rect,
        mut callback: impl FnMut(&CollisionShape) -> bool,
    ) {
        for tile in self.tiles_in_region(region) {
            if !callback(tile) {
                return;
            }
        }
    }

    pub fn tiles_at_region(&self, region: Rect) -> Vec<&CollisionShape> {
        self.tiles_in_region(region).collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.tiles.iter().flatten().count()
    }

    /// Draw every occupied tile, in `forced` color when the tilemap has one.
    pub(crate) fn debug_draw(
        &self,
        opacity: f32,
        forced: Option<Color>,
        renderer: &mut dyn DebugRenderer,
    ) {
        for tile in self.tiles.iter().flatten() {
            let color = forced.unwrap_or_else(|| tile.debug_color()).faded(opacity);
            renderer.fill_rect(tile.bounding_box(), color);
        }
    }
}
