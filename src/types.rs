use std::fmt;

use glam::Vec2;

use crate::shapes::CollisionShape;

/// User-defined opaque key carried through shapes and query results (e.g., pack your entity id).
pub type ColKey = u64;

/// Collision flags matching every mask.
pub const ALL_FLAGS: u32 = u32::MAX;

slotmap::new_key_type! {
    /// Arena key of a shape inside one collision world.
    pub struct ShapeKey;
}

/// Identity of a collision world, used by shapes to know which world owns them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorldId(pub u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Non-owning reference from a shape back to the world slot holding it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShapeHandle {
    pub world: WorldId,
    pub key: ShapeKey,
}

/// Shape discriminant, used as the resolver dispatch key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeId {
    Point,
    Circle,
    Rect,
    Lines,
    Tilemap,
}

impl ShapeId {
    pub const COUNT: usize = 5;
    pub const ALL: [ShapeId; Self::COUNT] = [
        ShapeId::Point,
        ShapeId::Circle,
        ShapeId::Rect,
        ShapeId::Lines,
        ShapeId::Tilemap,
    ];

    /// Row/column in the resolver table.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ShapeId::Point => "point",
            ShapeId::Circle => "circle",
            ShapeId::Rect => "rect",
            ShapeId::Lines => "lines",
            ShapeId::Tilemap => "tilemap",
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a pairwise narrowphase handler.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Contact {
    /// No collision.
    Miss,
    /// Shapes overlap over an area or a line; no single contact point.
    Overlap,
    /// Shapes touch at a single point.
    Point(Vec2),
}

impl Contact {
    pub fn is_hit(self) -> bool {
        !matches!(self, Contact::Miss)
    }

    pub(crate) fn from_bool(hit: bool) -> Self {
        if hit { Contact::Overlap } else { Contact::Miss }
    }

    pub(crate) fn point_if(hit: bool, p: Vec2) -> Self {
        if hit { Contact::Point(p) } else { Contact::Miss }
    }
}

/// Positive collision test between two shapes.
#[derive(Copy, Clone, Debug)]
pub struct CollisionTestResult<'a> {
    /// Contact position, only set when the shapes touch at a single point.
    pub position: Option<Vec2>,
    /// Shape the test was run for.
    pub first: &'a CollisionShape,
    /// Shape it collided with.
    pub second: &'a CollisionShape,
}

/// Shape a world query runs for: either a detached shape owned by the
/// caller, or a shape already stored in the queried world.
#[derive(Copy, Clone, Debug)]
pub enum QuerySource<'a> {
    Shape(&'a CollisionShape),
    Handle(ShapeHandle),
}

impl<'a> From<&'a CollisionShape> for QuerySource<'a> {
    fn from(shape: &'a CollisionShape) -> Self {
        QuerySource::Shape(shape)
    }
}

impl From<ShapeHandle> for QuerySource<'_> {
    fn from(handle: ShapeHandle) -> Self {
        QuerySource::Handle(handle)
    }
}

/// Cached grid cell range of an indexed shape: `[min_x, max_x) x [min_y, max_y)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl CellRange {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Cells in column-major order (x outer, y inner).
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.min_x..self.max_x).flat_map(move |x| (self.min_y..self.max_y).map(move |y| (x, y)))
    }

    pub fn cell_count(&self) -> usize {
        let w = (self.max_x - self.min_x).max(0) as usize;
        let h = (self.max_y - self.min_y).max(0) as usize;
        w * h
    }
}

/// World-level configuration.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Grid cell size in world units. Large cells mean fewer cell updates but
    /// more broadphase candidates per query.
    pub cell_size: Vec2,
}

impl WorldConfig {
    /// Square cells.
    pub fn uniform(cell_size: f32) -> Self {
        Self {
            cell_size: Vec2::splat(cell_size),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::uniform(512.0)
    }
}

/// Cumulative counters for a collision world. Reset with `CollisionWorld::reset_stats`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Re-index passes over shapes (including the first one on add).
    pub updated_shapes: u64,
    /// Shapes indexed for the first time.
    pub added_shapes: u64,
    /// Empty grid cells removed during flushes.
    pub deleted_grid_cells: u64,
    /// Grid cells allocated.
    pub created_grid_cells: u64,
    /// Broadphase candidates that passed dedup/self/mask filtering, before the predicate.
    pub broad_phase_shapes_checks_pre_predicate: u64,
    /// Broadphase candidates that also passed the predicate.
    pub broad_phase_shapes_checks_post_predicate: u64,
    pub broad_phase_calls: u64,
    /// Narrowphase tests performed.
    pub collision_checks: u64,
    /// Narrowphase tests that reported a collision.
    pub collision_matches: u64,
}

/// RGBA color in `[0, 1]`, used by debug drawing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::rgba(0.0, 0.5, 0.0, 1.0);
    pub const BLUE: Color = Color::rgba(0.0, 0.0, 1.0, 1.0);
    pub const YELLOW: Color = Color::rgba(1.0, 1.0, 0.0, 1.0);
    pub const PURPLE: Color = Color::rgba(0.5, 0.0, 0.5, 1.0);
    pub const TEAL: Color = Color::rgba(0.0, 0.5, 0.5, 1.0);
    pub const BROWN: Color = Color::rgba(0.65, 0.16, 0.16, 1.0);
    pub const ORANGE: Color = Color::rgba(1.0, 0.65, 0.0, 1.0);
    pub const MAGENTA: Color = Color::rgba(1.0, 0.0, 1.0, 1.0);
    pub const PINK: Color = Color::rgba(1.0, 0.75, 0.8, 1.0);
    pub const OLIVE: Color = Color::rgba(0.5, 0.5, 0.0, 1.0);

    /// Copy with alpha multiplied by `factor`.
    pub fn faded(self, factor: f32) -> Self {
        Self {
            a: self.a * factor,
            ..self
        }
    }

    /// Default debug color for a set of collision flags.
    pub fn for_flags(flags: u32) -> Self {
        const PALETTE: [Color; 12] = [
            Color::RED,
            Color::BLUE,
            Color::GREEN,
            Color::YELLOW,
            Color::PURPLE,
            Color::TEAL,
            Color::BROWN,
            Color::ORANGE,
            Color::MAGENTA,
            Color::PINK,
            Color::OLIVE,
            Color::BLACK,
        ];
        PALETTE[flags as usize % PALETTE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_range_iteration() {
        let r = CellRange { min_x: -1, min_y: 0, max_x: 1, max_y: 2 };
        let cells: Vec<_> = r.cells().collect();
        assert_eq!(cells, vec![(-1, 0), (-1, 1), (0, 0), (0, 1)]);
        assert_eq!(r.cell_count(), 4);
        assert!(r.contains(0, 1));
        assert!(!r.contains(1, 1));
    }

    #[test]
    fn test_shape_id_tags() {
        let tags: Vec<_> = ShapeId::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(tags, ["point", "circle", "rect", "lines", "tilemap"]);
        for (i, s) in ShapeId::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }
}
