//! Collision shapes: a closed set of geometric variants behind one wrapper
//! that carries flags, the caller's key and the owning-world handle.

use std::cell::OnceCell;

use glam::Vec2;

use crate::api::DebugRenderer;
use crate::geometry::{Circle, Line, Rect};
use crate::tilemap::TilemapShape;
use crate::types::*;

/// Reach used for points when sorting by distance.
const POINT_RADIUS: f32 = 1.0;

/// Zero-size shape at a position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointShape {
    position: Vec2,
}

impl PointShape {
    pub fn new(position: Vec2) -> Self {
        Self { position }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// 1x1 box anchored at the point, so it always lands in a grid cell.
    pub fn bounding_box(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, 1.0, 1.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CircleShape {
    circle: Circle,
}

impl CircleShape {
    pub fn new(circle: Circle) -> Self {
        Self { circle }
    }

    pub fn circle(&self) -> &Circle {
        &self.circle
    }

    pub fn set_circle(&mut self, circle: Circle) {
        self.circle = circle;
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RectShape {
    rect: Rect,
}

impl RectShape {
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn radius(&self) -> f32 {
        self.rect.bounding_circle().radius
    }
}

/// One or more line segments.
#[derive(Clone, Debug, Default)]
pub struct LinesShape {
    lines: Vec<Line>,
    // Derived from `lines`; emptied on every mutation.
    bounds: OnceCell<LineBounds>,
}

#[derive(Copy, Clone, Debug)]
struct LineBounds {
    rect: Rect,
    center: Vec2,
    radius: f32,
}

impl LinesShape {
    pub fn new<I: IntoIterator<Item = Line>>(lines: I) -> Self {
        Self {
            lines: lines.into_iter().collect(),
            bounds: OnceCell::new(),
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn set_lines<I: IntoIterator<Item = Line>>(&mut self, lines: I) {
        self.lines.clear();
        self.add_lines(lines);
    }

    pub fn add_lines<I: IntoIterator<Item = Line>>(&mut self, lines: I) {
        self.lines.extend(lines);
        self.bounds = OnceCell::new();
    }

    fn derived(&self) -> &LineBounds {
        self.bounds.get_or_init(|| {
            let rect = Rect::from_points(self.lines.iter().flat_map(|l| [l.from, l.to]))
                .unwrap_or_default();
            LineBounds {
                rect,
                center: rect.center(),
                // max(w, h), a loose upper bound.
                radius: rect.width.max(rect.height),
            }
        })
    }

    pub fn bounding_box(&self) -> Rect {
        self.derived().rect
    }

    pub fn center(&self) -> Vec2 {
        self.derived().center
    }

    pub fn radius(&self) -> f32 {
        self.derived().radius
    }
}

impl PartialEq for LinesShape {
    fn eq(&self, other: &Self) -> bool {
        self.lines == other.lines
    }
}

/// Geometry of a collision shape.
#[derive(Clone, Debug)]
pub enum ShapeKind {
    Point(PointShape),
    Circle(CircleShape),
    Rect(RectShape),
    Lines(LinesShape),
    Tilemap(TilemapShape),
}

impl ShapeKind {
    pub fn id(&self) -> ShapeId {
        match self {
            ShapeKind::Point(_) => ShapeId::Point,
            ShapeKind::Circle(_) => ShapeId::Circle,
            ShapeKind::Rect(_) => ShapeId::Rect,
            ShapeKind::Lines(_) => ShapeId::Lines,
            ShapeKind::Tilemap(_) => ShapeId::Tilemap,
        }
    }
}

/// A collidable shape. Created detached; a `CollisionWorld` takes ownership
/// on `add_shape` and stamps it with a handle.
#[derive(Clone, Debug)]
pub struct CollisionShape {
    kind: ShapeKind,
    /// Matched against query masks; at least one common bit is needed.
    pub collision_flags: u32,
    /// Optional user key echoed back through query results.
    pub user_key: Option<ColKey>,
    debug_color: Option<Color>,
    handle: Option<ShapeHandle>,
}

impl CollisionShape {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            collision_flags: ALL_FLAGS,
            user_key: None,
            debug_color: None,
            handle: None,
        }
    }

    pub fn point(position: Vec2) -> Self {
        Self::new(ShapeKind::Point(PointShape::new(position)))
    }

    pub fn circle(circle: Circle) -> Self {
        Self::new(ShapeKind::Circle(CircleShape::new(circle)))
    }

    pub fn rect(rect: Rect) -> Self {
        Self::new(ShapeKind::Rect(RectShape::new(rect)))
    }

    pub fn lines<I: IntoIterator<Item = Line>>(lines: I) -> Self {
        Self::new(ShapeKind::Lines(LinesShape::new(lines)))
    }

    pub fn tilemap(tilemap: TilemapShape) -> Self {
        Self::new(ShapeKind::Tilemap(tilemap))
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.collision_flags = flags;
        self
    }

    pub fn with_user_key(mut self, key: ColKey) -> Self {
        self.user_key = Some(key);
        self
    }

    pub fn shape_id(&self) -> ShapeId {
        self.kind.id()
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Mutable geometry. For world-owned shapes this is only reachable through
    /// `CollisionWorld::shape_mut`, which queues the re-index.
    pub fn kind_mut(&mut self) -> &mut ShapeKind {
        &mut self.kind
    }

    /// Owning world slot, `None` while detached.
    pub fn handle(&self) -> Option<ShapeHandle> {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: Option<ShapeHandle>) {
        self.handle = handle;
    }

    pub fn center(&self) -> Vec2 {
        match &self.kind {
            ShapeKind::Point(p) => p.position(),
            ShapeKind::Circle(c) => c.circle().center,
            ShapeKind::Rect(r) => r.rect().center(),
            ShapeKind::Lines(l) => l.center(),
            ShapeKind::Tilemap(t) => t.center(),
        }
    }

    /// Axis-aligned box fully containing the shape.
    pub fn bounding_box(&self) -> Rect {
        match &self.kind {
            ShapeKind::Point(p) => p.bounding_box(),
            ShapeKind::Circle(c) => c.circle().bounding_box(),
            ShapeKind::Rect(r) => *r.rect(),
            ShapeKind::Lines(l) => l.bounding_box(),
            ShapeKind::Tilemap(t) => t.bounding_box(),
        }
    }

    /// Upper bound on the shape's reach from its center.
    pub fn radius(&self) -> f32 {
        match &self.kind {
            ShapeKind::Point(_) => POINT_RADIUS,
            ShapeKind::Circle(c) => c.circle().radius,
            ShapeKind::Rect(r) => r.radius(),
            ShapeKind::Lines(l) => l.radius(),
            ShapeKind::Tilemap(t) => t.radius(),
        }
    }

    /// Force a debug color, or `None` to derive one from the collision flags.
    pub fn set_debug_color(&mut self, color: Option<Color>) {
        self.debug_color = color;
    }

    pub fn debug_color(&self) -> Color {
        self.debug_color
            .unwrap_or_else(|| Color::for_flags(self.collision_flags))
    }

    pub fn debug_draw(&self, opacity: f32, renderer: &mut dyn DebugRenderer) {
        let color = self.debug_color().faded(opacity);
        match &self.kind {
            ShapeKind::Point(p) => {
                renderer.draw_circle(Circle::new(p.position(), 3.0), color, 4);
            }
            ShapeKind::Circle(c) => renderer.draw_circle(*c.circle(), color, 14),
            ShapeKind::Rect(r) => renderer.fill_rect(*r.rect(), color),
            ShapeKind::Lines(l) => {
                for line in l.lines() {
                    renderer.draw_line(line.from, line.to, color);
                }
            }
            ShapeKind::Tilemap(t) => t.debug_draw(opacity, self.debug_color, renderer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_bounds() {
        let s = CollisionShape::point(Vec2::new(3.0, 4.0));
        assert_eq!(s.shape_id(), ShapeId::Point);
        assert_eq!(s.bounding_box(), Rect::new(3.0, 4.0, 1.0, 1.0));
        assert_eq!(s.center(), Vec2::new(3.0, 4.0));
        assert_eq!(s.radius(), 1.0);
        assert_eq!(s.collision_flags, ALL_FLAGS);
        assert!(s.handle().is_none());
    }

    #[test]
    fn test_circle_and_rect_bounds() {
        let c = CollisionShape::circle(Circle::new(Vec2::new(10.0, 10.0), 5.0));
        assert_eq!(c.bounding_box(), Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(c.radius(), 5.0);

        let r = CollisionShape::rect(Rect::new(0.0, 0.0, 6.0, 8.0));
        assert_eq!(r.center(), Vec2::new(3.0, 4.0));
        assert!((r.radius() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_lines_bounds_are_recomputed_on_mutation() {
        let mut s = CollisionShape::lines([Line::new(Vec2::ZERO, Vec2::new(10.0, 4.0))]);
        assert_eq!(s.bounding_box(), Rect::new(0.0, 0.0, 10.0, 4.0));
        assert_eq!(s.radius(), 10.0);
        assert_eq!(s.center(), Vec2::new(5.0, 2.0));

        let ShapeKind::Lines(l) = s.kind_mut() else { unreachable!() };
        l.add_lines([Line::new(Vec2::new(-2.0, 0.0), Vec2::new(0.0, 20.0))]);
        assert_eq!(s.bounding_box(), Rect::new(-2.0, 0.0, 12.0, 20.0));
        assert_eq!(s.radius(), 20.0);

        let ShapeKind::Lines(l) = s.kind_mut() else { unreachable!() };
        l.set_lines([Line::new(Vec2::ONE, Vec2::new(2.0, 2.0))]);
        assert_eq!(l.lines().len(), 1);
        assert_eq!(s.bounding_box(), Rect::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn test_setters_round_trip() {
        let mut p = PointShape::new(Vec2::ZERO);
        p.set_position(Vec2::new(7.0, -2.0));
        assert_eq!(p.position(), Vec2::new(7.0, -2.0));

        let mut c = CircleShape::new(Circle::default());
        c.set_circle(Circle::new(Vec2::ONE, 3.0));
        assert_eq!(*c.circle(), Circle::new(Vec2::ONE, 3.0));

        let mut r = RectShape::new(Rect::default());
        r.set_rect(Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(*r.rect(), Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_debug_color_follows_flags_unless_forced() {
        let mut s = CollisionShape::point(Vec2::ZERO).with_flags(1);
        assert_eq!(s.debug_color(), Color::for_flags(1));
        s.set_debug_color(Some(Color::TEAL));
        assert_eq!(s.debug_color(), Color::TEAL);
    }
}
