use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::geometry::{Circle, Line, Rect};

/// Per-axis distance under which two points count as the same point.
pub const POINT_TOLERANCE: f32 = 1.0;
/// Slack allowed when testing if a point lies on a segment.
pub const SEGMENT_TOLERANCE: f32 = 0.5;

/// Boolean primitive intersection tests.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn points_coincide(a: Vec2, b: Vec2, tolerance: f32) -> bool {
        let d = (a - b).abs();
        d.x <= tolerance && d.y <= tolerance
    }

    fn point_circle(p: Vec2, circle: &Circle) -> bool {
        circle.contains_point(p)
    }

    fn point_rect(p: Vec2, rect: &Rect) -> bool {
        rect.contains_point(p)
    }

    fn point_segment(p: Vec2, line: &Line, tolerance: f32) -> bool {
        let detour = line.from.distance(p) + line.to.distance(p) - line.length();
        detour.abs() <= tolerance
    }

    fn circle_circle(a: &Circle, b: &Circle) -> bool {
        let rsum = a.radius + b.radius;
        a.center.distance_squared(b.center) <= rsum * rsum
    }

    fn circle_rect(circle: &Circle, rect: &Rect) -> bool {
        // Closest point of the box to the center.
        let closest = circle.center.max(rect.min()).min(rect.max());
        closest.distance_squared(circle.center) <= circle.radius * circle.radius
    }

    /// Strict overlap: rects sharing only an edge do not collide.
    fn rect_rect(a: &Rect, b: &Rect) -> bool {
        !(b.left() >= a.right()
            || b.right() <= a.left()
            || b.top() >= a.bottom()
            || b.bottom() <= a.top())
    }

    fn circle_segment(circle: &Circle, line: &Line) -> bool {
        line.distance_to_point(circle.center) <= circle.radius
    }

    fn segment_rect(line: &Line, rect: &Rect) -> bool {
        // Slab test clamped to the segment's [0, 1] parameter range.
        let (min, max) = (rect.min(), rect.max());
        let d = line.to - line.from;
        let mut tmin = 0.0_f32;
        let mut tmax = 1.0_f32;
        for axis in 0..2 {
            let origin = line.from[axis];
            if d[axis].abs() < f32::EPSILON {
                if origin < min[axis] || origin > max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut t1 = (min[axis] - origin) * inv;
            let mut t2 = (max[axis] - origin) * inv;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return false;
            }
        }
        true
    }

    /// Segments sharing an endpoint always collide; parallel segments never do
    /// otherwise, even when collinear and overlapping.
    fn segment_segment(a: &Line, b: &Line) -> bool {
        let (p0, p1, p2, p3) = (a.from, a.to, b.from, b.to);
        if p0 == p2 || p0 == p3 || p1 == p2 || p1 == p3 {
            return true;
        }
        let s1 = p1 - p0;
        let s2 = p3 - p2;
        let denom = -s2.x * s1.y + s1.x * s2.y;
        if denom == 0.0 {
            return false;
        }
        let s = (-s1.y * (p0.x - p2.x) + s1.x * (p0.y - p2.y)) / denom;
        let t = (s2.x * (p0.y - p2.y) - s2.y * (p0.x - p2.x)) / denom;
        (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t)
    }
}

/// Built-in shape-pair handlers. Each one expects its arguments in the order
/// of its name; the resolver takes care of mirrored lookups.
pub mod pairs {
    use super::{Narrowphase, POINT_TOLERANCE, SEGMENT_TOLERANCE};
    use crate::api::NarrowphaseApi;
    use crate::resolver::HandlerFn;
    use crate::shapes::{CollisionShape, ShapeKind};
    use crate::types::{Contact, ShapeId};

    /// Every pair registered by `CollisionResolver::with_builtin_handlers`.
    pub const BUILTIN: [(ShapeId, ShapeId, HandlerFn); 14] = [
        (ShapeId::Point, ShapeId::Point, point_point),
        (ShapeId::Point, ShapeId::Circle, point_circle),
        (ShapeId::Point, ShapeId::Rect, point_rect),
        (ShapeId::Point, ShapeId::Lines, point_lines),
        (ShapeId::Point, ShapeId::Tilemap, point_tilemap),
        (ShapeId::Circle, ShapeId::Circle, circle_circle),
        (ShapeId::Circle, ShapeId::Rect, circle_rect),
        (ShapeId::Circle, ShapeId::Lines, circle_lines),
        (ShapeId::Circle, ShapeId::Tilemap, circle_tilemap),
        (ShapeId::Rect, ShapeId::Rect, rect_rect),
        (ShapeId::Rect, ShapeId::Lines, rect_lines),
        (ShapeId::Rect, ShapeId::Tilemap, rect_tilemap),
        (ShapeId::Lines, ShapeId::Lines, lines_lines),
        (ShapeId::Lines, ShapeId::Tilemap, lines_tilemap),
    ];

    pub fn point_point(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Point(p1), ShapeKind::Point(p2)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let hit = Narrowphase::points_coincide(p1.position(), p2.position(), POINT_TOLERANCE);
        Contact::point_if(hit, p1.position())
    }

    pub fn point_circle(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Point(p), ShapeKind::Circle(c)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        Contact::point_if(Narrowphase::point_circle(p.position(), c.circle()), p.position())
    }

    pub fn point_rect(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Point(p), ShapeKind::Rect(r)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        Contact::point_if(Narrowphase::point_rect(p.position(), r.rect()), p.position())
    }

    pub fn point_lines(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Point(p), ShapeKind::Lines(l)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let hit = l
            .lines()
            .iter()
            .any(|line| Narrowphase::point_segment(p.position(), line, SEGMENT_TOLERANCE));
        Contact::point_if(hit, p.position())
    }

    /// Inside the tile area only occupied tiles count. The border band around
    /// it is solid.
    pub fn point_tilemap(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Point(_), ShapeKind::Tilemap(tm)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let pos = a.center();
        if tm.inner_bounds().contains_point(pos) {
            return match tm.tile_at(pos) {
                Some(tile) => point_rect(a, tile),
                None => Contact::Miss,
            };
        }
        Contact::from_bool(tm.border_thickness() > 0.0 && tm.bounding_box().contains_point(pos))
    }

    pub fn circle_circle(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Circle(c1), ShapeKind::Circle(c2)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        Contact::from_bool(Narrowphase::circle_circle(c1.circle(), c2.circle()))
    }

    pub fn circle_rect(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Circle(c), ShapeKind::Rect(r)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        Contact::from_bool(Narrowphase::circle_rect(c.circle(), r.rect()))
    }

    pub fn circle_lines(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Circle(c), ShapeKind::Lines(l)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let hit = l
            .lines()
            .iter()
            .any(|line| Narrowphase::circle_segment(c.circle(), line));
        Contact::from_bool(hit)
    }

    pub fn circle_tilemap(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Circle(c), ShapeKind::Tilemap(tm)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let hit = tm
            .tiles_in_region(a.bounding_box())
            .any(|tile| Narrowphase::circle_rect(c.circle(), &tile.bounding_box()));
        Contact::from_bool(hit)
    }

    pub fn rect_rect(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Rect(r1), ShapeKind::Rect(r2)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        Contact::from_bool(Narrowphase::rect_rect(r1.rect(), r2.rect()))
    }

    pub fn rect_lines(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Rect(r), ShapeKind::Lines(l)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let hit = l
            .lines()
            .iter()
            .any(|line| Narrowphase::segment_rect(line, r.rect()));
        Contact::from_bool(hit)
    }

    /// Approximate: any occupied tile in the index range of the rect counts,
    /// including one touching its far edge.
    pub fn rect_tilemap(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Rect(r), ShapeKind::Tilemap(tm)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        Contact::from_bool(tm.tiles_in_region(*r.rect()).next().is_some())
    }

    pub fn lines_lines(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Lines(l1), ShapeKind::Lines(l2)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let hit = l1.lines().iter().any(|s1| {
            l2.lines()
                .iter()
                .any(|s2| Narrowphase::segment_segment(s1, s2))
        });
        Contact::from_bool(hit)
    }

    pub fn lines_tilemap(a: &CollisionShape, b: &CollisionShape) -> Contact {
        let (ShapeKind::Lines(l), ShapeKind::Tilemap(tm)) = (a.kind(), b.kind()) else {
            return Contact::Miss;
        };
        let hit = tm.tiles_in_region(l.bounding_box()).any(|tile| {
            let rect = tile.bounding_box();
            l.lines()
                .iter()
                .any(|line| Narrowphase::segment_rect(line, &rect))
        });
        Contact::from_bool(hit)
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec2, UVec2};

    use super::pairs::*;
    use super::*;
    use crate::shapes::CollisionShape;
    use crate::tilemap::TilemapShape;
    use crate::types::Contact;

    fn seg(ax: f32, ay: f32, bx: f32, by: f32) -> Line {
        Line::new(Vec2::new(ax, ay), Vec2::new(bx, by))
    }

    #[test]
    fn test_points_coincide_per_axis() {
        assert!(Narrowphase::points_coincide(Vec2::ZERO, Vec2::new(1.0, 1.0), 1.0));
        assert!(!Narrowphase::points_coincide(Vec2::ZERO, Vec2::new(1.1, 0.0), 1.0));
    }

    #[test]
    fn test_point_circle_and_rect_edges() {
        let c = Circle::new(Vec2::new(1.0, -1.0), 2.0);
        assert!(Narrowphase::point_circle(Vec2::new(3.0, -1.0), &c));
        assert!(!Narrowphase::point_circle(Vec2::new(3.1, -1.0), &c));

        let r = Rect::new(0.0, 0.0, 2.0, 4.0);
        assert!(Narrowphase::point_rect(Vec2::new(2.0, 4.0), &r));
        assert!(!Narrowphase::point_rect(Vec2::new(2.1, 0.0), &r));
    }

    #[test]
    fn test_point_segment_tolerance() {
        let l = seg(0.0, 0.0, 10.0, 0.0);
        assert!(Narrowphase::point_segment(Vec2::new(5.0, 0.0), &l, SEGMENT_TOLERANCE));
        assert!(Narrowphase::point_segment(Vec2::new(5.0, 1.0), &l, SEGMENT_TOLERANCE));
        assert!(!Narrowphase::point_segment(Vec2::new(5.0, 3.0), &l, SEGMENT_TOLERANCE));
        assert!(!Narrowphase::point_segment(Vec2::new(11.0, 0.0), &l, 0.5));
    }

    #[test]
    fn test_rect_rect_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::rect_rect(&a, &Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!Narrowphase::rect_rect(&a, &Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!Narrowphase::rect_rect(&a, &Rect::new(0.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn test_circle_rect_corner() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::circle_rect(&Circle::new(Vec2::new(5.0, 5.0), 1.0), &r));
        assert!(Narrowphase::circle_rect(&Circle::new(Vec2::new(13.0, 14.0), 5.0), &r));
        assert!(!Narrowphase::circle_rect(&Circle::new(Vec2::new(14.0, 14.0), 5.0), &r));
    }

    #[test]
    fn test_segment_rect_hit_and_miss() {
        let r = Rect::new(-1.0, -1.0, 2.0, 2.0);
        assert!(Narrowphase::segment_rect(&seg(-2.0, 0.0, 2.0, 0.0), &r));
        assert!(Narrowphase::segment_rect(&seg(0.0, 0.0, 0.5, 0.5), &r));
        assert!(!Narrowphase::segment_rect(&seg(-2.0, 2.0, 2.0, 2.0), &r));
        assert!(!Narrowphase::segment_rect(&seg(-5.0, 0.0, -3.0, 0.0), &r));
        assert!(Narrowphase::segment_rect(&seg(-3.0, 0.0, 0.0, 3.0), &Rect::new(-2.0, 0.0, 2.0, 2.0)));
    }

    #[test]
    fn test_segment_segment_cases() {
        assert!(Narrowphase::segment_segment(
            &seg(0.0, 0.0, 10.0, 10.0),
            &seg(0.0, 10.0, 10.0, 0.0)
        ));
        assert!(!Narrowphase::segment_segment(
            &seg(0.0, 0.0, 1.0, 1.0),
            &seg(0.0, 10.0, 10.0, 0.0)
        ));
        // Shared endpoint.
        assert!(Narrowphase::segment_segment(
            &seg(0.0, 0.0, 5.0, 0.0),
            &seg(5.0, 0.0, 5.0, 5.0)
        ));
        // Collinear overlap without a shared endpoint.
        assert!(!Narrowphase::segment_segment(
            &seg(0.0, 0.0, 5.0, 0.0),
            &seg(2.0, 0.0, 8.0, 0.0)
        ));
    }

    #[test]
    fn test_circle_segment() {
        let l = seg(-2.0, 0.0, 2.0, 0.0);
        assert!(Narrowphase::circle_segment(&Circle::new(Vec2::new(0.0, 1.0), 1.0), &l));
        assert!(!Narrowphase::circle_segment(&Circle::new(Vec2::new(4.0, 0.0), 1.5), &l));
    }

    #[test]
    fn test_point_pairs_report_position() {
        let p = CollisionShape::point(Vec2::new(25.0, 25.0));
        let r = CollisionShape::rect(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(point_rect(&p, &r), Contact::Point(Vec2::new(25.0, 25.0)));

        let far = CollisionShape::point(Vec2::new(60.0, 25.0));
        assert_eq!(point_rect(&far, &r), Contact::Miss);

        let q = CollisionShape::point(Vec2::new(25.5, 24.0));
        assert_eq!(point_point(&p, &q), Contact::Point(Vec2::new(25.0, 25.0)));
    }

    #[test]
    fn test_area_pairs_report_overlap() {
        let c1 = CollisionShape::circle(Circle::new(Vec2::ZERO, 10.0));
        let c2 = CollisionShape::circle(Circle::new(Vec2::new(15.0, 0.0), 10.0));
        assert_eq!(circle_circle(&c1, &c2), Contact::Overlap);

        let lines = CollisionShape::lines([seg(-20.0, 5.0, 20.0, 5.0)]);
        assert_eq!(circle_lines(&c1, &lines), Contact::Overlap);
        let r = CollisionShape::rect(Rect::new(-1.0, 0.0, 2.0, 10.0));
        assert_eq!(rect_lines(&r, &lines), Contact::Overlap);

        let crossing = CollisionShape::lines([seg(0.0, 0.0, 0.0, 10.0)]);
        assert_eq!(lines_lines(&lines, &crossing), Contact::Overlap);
    }

    #[test]
    fn test_mismatched_kinds_miss() {
        let p = CollisionShape::point(Vec2::ZERO);
        assert_eq!(circle_circle(&p, &p), Contact::Miss);
    }

    fn walled_map() -> CollisionShape {
        let mut tm = TilemapShape::new(Vec2::ZERO, UVec2::new(4, 4), Vec2::splat(10.0), 5.0);
        tm.set_tile(IVec2::new(2, 2), true, None).unwrap();
        CollisionShape::tilemap(tm)
    }

    #[test]
    fn test_point_tilemap_tiles_and_border() {
        let tm = walled_map();
        let on_tile = CollisionShape::point(Vec2::new(25.0, 25.0));
        assert_eq!(point_tilemap(&on_tile, &tm), Contact::Point(Vec2::new(25.0, 25.0)));

        let empty_tile = CollisionShape::point(Vec2::new(5.0, 5.0));
        assert_eq!(point_tilemap(&empty_tile, &tm), Contact::Miss);

        let in_border = CollisionShape::point(Vec2::new(-3.0, 20.0));
        assert_eq!(point_tilemap(&in_border, &tm), Contact::Overlap);

        let outside = CollisionShape::point(Vec2::new(-6.0, 20.0));
        assert_eq!(point_tilemap(&outside, &tm), Contact::Miss);
    }

    #[test]
    fn test_area_tilemap_pairs() {
        let tm = walled_map();
        let near = CollisionShape::circle(Circle::new(Vec2::new(17.0, 25.0), 4.0));
        assert_eq!(circle_tilemap(&near, &tm), Contact::Overlap);
        let short = CollisionShape::circle(Circle::new(Vec2::new(15.0, 25.0), 4.0));
        assert_eq!(circle_tilemap(&short, &tm), Contact::Miss);

        let lines = CollisionShape::lines([seg(0.0, 25.0, 40.0, 25.0)]);
        assert_eq!(lines_tilemap(&lines, &tm), Contact::Overlap);
        let above = CollisionShape::lines([seg(0.0, 5.0, 40.0, 5.0)]);
        assert_eq!(lines_tilemap(&above, &tm), Contact::Miss);
    }

    #[test]
    fn test_rect_tilemap_is_region_approximation() {
        let tm = walled_map();
        let overlapping = CollisionShape::rect(Rect::new(22.0, 22.0, 2.0, 2.0));
        assert_eq!(rect_tilemap(&overlapping, &tm), Contact::Overlap);

        // Touches the occupied tile only along its edge at x = 20; the
        // inclusive far index still reports it.
        let touching = CollisionShape::rect(Rect::new(12.0, 22.0, 8.0, 2.0));
        assert_eq!(rect_tilemap(&touching, &tm), Contact::Overlap);

        let clear = CollisionShape::rect(Rect::new(2.0, 2.0, 5.0, 5.0));
        assert_eq!(rect_tilemap(&clear, &tm), Contact::Miss);
    }
}
