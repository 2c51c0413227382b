//! gridbonk: grid-partitioned 2D collision detection (broad phase + shape-pair narrow phase, no resolution)

pub mod types;
pub mod api;
pub mod error;
pub mod geometry;
pub mod shapes;
pub mod tilemap;
pub mod narrowphase;
pub mod resolver;
pub mod world;
pub mod manager;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::{CollisionError, CollisionResult};
pub use crate::geometry::{Circle, Line, Rect};
pub use crate::shapes::{CircleShape, CollisionShape, LinesShape, PointShape, RectShape, ShapeKind};
pub use crate::tilemap::TilemapShape;
pub use crate::narrowphase::Narrowphase;
pub use crate::resolver::{CollisionResolver, Handler, HandlerFn, HandlerRow};
pub use crate::world::CollisionWorld;
pub use crate::manager::Collision;
