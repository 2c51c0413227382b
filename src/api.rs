use std::rc::Rc;

use glam::Vec2;

use crate::error::CollisionResult;
use crate::geometry::{Circle, Line, Rect};
use crate::resolver::CollisionResolver;
use crate::shapes::CollisionShape;
use crate::types::*;

/// Public API contract for a persistent, grid-indexed collision world.
pub trait CollisionWorldApi {
    /// Construct an empty world that tests pairs with `resolver`.
    fn new(resolver: Rc<CollisionResolver>, cfg: WorldConfig) -> Self
    where
        Self: Sized;

    // --- Membership --------------------------------------------------------

    /// Take ownership of a detached shape and index it. Fails if the shape
    /// still carries a handle from another world.
    fn add_shape(&mut self, shape: CollisionShape) -> CollisionResult<ShapeHandle>;

    /// Detach a shape and hand it back. Unknown handles are logged and ignored.
    fn remove_shape(&mut self, handle: ShapeHandle) -> Option<CollisionShape>;

    /// Apply queued re-indexing and drop empty grid cells.
    fn flush(&mut self);

    /// Visit every shape once; return `false` to stop.
    fn iterate_shapes(&self, callback: &mut dyn FnMut(&CollisionShape) -> bool);

    // --- Queries -----------------------------------------------------------

    /// First shape colliding with `source`. With `sort_by_distance`, candidates
    /// are ordered by approximate reach distance before testing.
    fn test_collision<'a>(
        &'a mut self,
        source: impl Into<QuerySource<'a>>,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
    ) -> Option<CollisionTestResult<'a>>;

    /// Every shape colliding with `source`. `on_each` runs after each hit and
    /// may return `false` to stop early (results gathered so far are kept).
    fn test_collision_many<'a>(
        &'a mut self,
        source: impl Into<QuerySource<'a>>,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
        on_each: Option<&mut dyn FnMut(&CollisionTestResult<'_>) -> bool>,
    ) -> Vec<CollisionTestResult<'a>>;

    /// Shapes touching `position` (a point probe, or a circle when `radius > 1`).
    fn pick<'a>(
        &'a mut self,
        position: Vec2,
        radius: f32,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
    ) -> Vec<&'a CollisionShape>;

    // --- Diagnostics -------------------------------------------------------

    /// Draw grid cells inside `region` and the shapes they hold.
    fn debug_draw(
        &mut self,
        renderer: &mut dyn DebugRenderer,
        region: Rect,
        grid_color: Option<Color>,
        highlight_color: Option<Color>,
        opacity: f32,
    );

    fn stats(&self) -> &WorldStats;

    fn reset_stats(&mut self);
}

/// Boolean primitive intersection tests the pair handlers are built from.
pub trait NarrowphaseApi {
    // Points ----------------------------------------------------------------

    fn points_coincide(a: Vec2, b: Vec2, tolerance: f32) -> bool;
    fn point_circle(p: Vec2, circle: &Circle) -> bool;
    fn point_rect(p: Vec2, rect: &Rect) -> bool;
    fn point_segment(p: Vec2, line: &Line, tolerance: f32) -> bool;

    // Areas -----------------------------------------------------------------

    fn circle_circle(a: &Circle, b: &Circle) -> bool;
    fn circle_rect(circle: &Circle, rect: &Rect) -> bool;
    fn rect_rect(a: &Rect, b: &Rect) -> bool;

    // Segments --------------------------------------------------------------

    fn circle_segment(circle: &Circle, line: &Line) -> bool;
    fn segment_rect(line: &Line, rect: &Rect) -> bool;
    fn segment_segment(a: &Line, b: &Line) -> bool;
}

/// Sink for debug drawing. Implement it over whatever renderer the game uses.
pub trait DebugRenderer {
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn draw_circle(&mut self, circle: Circle, color: Color, segments: u32);
    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color);
}
