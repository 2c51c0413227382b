use thiserror::Error;

use crate::types::WorldId;

/// Programmer errors raised by world membership and tilemap addressing.
///
/// Query-time problems (missing resolver handlers, removing a shape from the
/// wrong world) are not errors: they are logged and degrade to "no collision".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollisionError {
    /// The shape already belongs to a collision world and must be removed first.
    #[error("cannot add collision shape: it already belongs to world {world}")]
    AlreadyInWorld { world: WorldId },

    /// A tile index outside the tilemap grid was addressed.
    #[error("collision tile ({x}, {y}) is out of bounds for a {width}x{height} tilemap")]
    TileOutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

pub type CollisionResult<T> = Result<T, CollisionError>;
