//! Plain geometry primitives the collision shapes wrap.
//!
//! Rectangles are stored by their top-left corner and size, with `y` growing
//! downwards (screen space).

use glam::Vec2;

/// Axis-aligned rectangle (top-left corner + size).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from min/max corners.
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Smallest rectangle enclosing every point, or `None` for an empty set.
    pub fn from_points<I: IntoIterator<Item = Vec2>>(points: I) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self::from_min_max(min, max))
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.left(), self.top())
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Corners in clockwise order starting at the top-left.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left(), self.top()),
            Vec2::new(self.right(), self.top()),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.left(), self.bottom()),
        ]
    }

    /// Edge-inclusive containment.
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Circle through all four corners.
    pub fn bounding_circle(&self) -> Circle {
        let center = self.center();
        Circle::new(center, center.distance(self.min()))
    }

    /// Grow (or shrink, for negative amounts) around the same center.
    /// `amount` is the total change in width and height.
    pub fn resize(&self, amount: Vec2) -> Self {
        Self::new(
            self.x - amount.x * 0.5,
            self.y - amount.y * 0.5,
            self.width + amount.x,
            self.height + amount.y,
        )
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub const fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Enclosing square.
    pub fn bounding_box(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.radius * 2.0,
            self.radius * 2.0,
        )
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        self.center.distance_squared(p) <= self.radius * self.radius
    }
}

/// Line segment.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub from: Vec2,
    pub to: Vec2,
}

impl Line {
    pub const fn new(from: Vec2, to: Vec2) -> Self {
        Self { from, to }
    }

    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }

    /// Closest point on the segment to `p`.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        let d = self.to - self.from;
        let len2 = d.length_squared();
        if len2 == 0.0 {
            return self.from;
        }
        let t = ((p - self.from).dot(d) / len2).clamp(0.0, 1.0);
        self.from + d * t
    }

    pub fn distance_to_point(&self, p: Vec2) -> f32 {
        self.closest_point(p).distance(p)
    }
}
