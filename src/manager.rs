use std::rc::Rc;

use glam::{UVec2, Vec2};
use log::info;

use crate::api::CollisionWorldApi;
use crate::geometry::{Circle, Line, Rect};
use crate::resolver::{CollisionResolver, HandlerFn};
use crate::shapes::CollisionShape;
use crate::tilemap::TilemapShape;
use crate::types::{ShapeId, WorldConfig};
use crate::world::CollisionWorld;

/// Entry point: owns the shared resolver and creates worlds that use it.
#[derive(Clone, Debug)]
pub struct Collision {
    resolver: Rc<CollisionResolver>,
}

impl Default for Collision {
    fn default() -> Self {
        Self::new()
    }
}

impl Collision {
    /// Manager with every built-in shape pair registered.
    pub fn new() -> Self {
        info!("setup collision manager");
        Self {
            resolver: Rc::new(CollisionResolver::with_builtin_handlers()),
        }
    }

    /// Manager around a caller-built resolver.
    pub fn with_resolver(resolver: CollisionResolver) -> Self {
        Self {
            resolver: Rc::new(resolver),
        }
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    /// Register or replace a pair handler. Worlds created before this call
    /// keep the table they were created with.
    pub fn set_handler(&mut self, first: ShapeId, second: ShapeId, func: HandlerFn) {
        Rc::make_mut(&mut self.resolver).set_handler(first, second, func);
    }

    pub fn create_world(&self, cfg: WorldConfig) -> CollisionWorld {
        CollisionWorld::new(Rc::clone(&self.resolver), cfg)
    }

    pub fn point(&self, position: Vec2) -> CollisionShape {
        CollisionShape::point(position)
    }

    pub fn circle(&self, center: Vec2, radius: f32) -> CollisionShape {
        CollisionShape::circle(Circle::new(center, radius))
    }

    pub fn rect(&self, rect: Rect) -> CollisionShape {
        CollisionShape::rect(rect)
    }

    pub fn lines<I: IntoIterator<Item = Line>>(&self, lines: I) -> CollisionShape {
        CollisionShape::lines(lines)
    }

    pub fn tilemap(
        &self,
        offset: Vec2,
        grid_size: UVec2,
        tile_size: Vec2,
        border_thickness: f32,
    ) -> CollisionShape {
        CollisionShape::tilemap(TilemapShape::new(offset, grid_size, tile_size, border_thickness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::CollisionShape;
    use crate::types::Contact;

    fn never(_: &CollisionShape, _: &CollisionShape) -> Contact {
        Contact::Miss
    }

    #[test]
    fn test_worlds_share_the_resolver() {
        let collision = Collision::new();
        let a = collision.create_world(WorldConfig::default());
        let b = collision.create_world(WorldConfig::uniform(64.0));
        assert!(Rc::ptr_eq(a.resolver(), b.resolver()));
        assert_ne!(a.id(), b.id());
        assert_eq!(b.cell_size(), Vec2::splat(64.0));
    }

    #[test]
    fn test_set_handler_applies_to_new_worlds_only() {
        let mut collision = Collision::new();
        let mut old = collision.create_world(WorldConfig::default());
        collision.set_handler(ShapeId::Point, ShapeId::Circle, never);
        let mut new = collision.create_world(WorldConfig::default());

        for w in [&mut old, &mut new] {
            w.add_shape(collision.circle(Vec2::ZERO, 10.0)).unwrap();
        }
        let probe = collision.point(Vec2::ZERO);
        assert!(old.test_collision(&probe, false, None, None).is_some());
        assert!(new.test_collision(&probe, false, None, None).is_none());
    }

    #[test]
    fn test_shape_factories() {
        let collision = Collision::default();
        let tm = collision.tilemap(Vec2::ZERO, UVec2::new(2, 2), Vec2::splat(8.0), 1.0);
        assert_eq!(tm.shape_id(), ShapeId::Tilemap);
        assert_eq!(tm.bounding_box(), Rect::new(-1.0, -1.0, 18.0, 18.0));
        let l = collision.lines([Line::new(Vec2::ZERO, Vec2::ONE)]);
        assert_eq!(l.shape_id(), ShapeId::Lines);
        assert_eq!(collision.rect(Rect::new(0.0, 0.0, 1.0, 1.0)).shape_id(), ShapeId::Rect);
    }
}
