use std::fmt;

use log::{debug, warn};

use crate::narrowphase::pairs;
use crate::shapes::CollisionShape;
use crate::types::*;

/// Pairwise collision test. Gets the shapes in the order it was registered for.
pub type HandlerFn = fn(&CollisionShape, &CollisionShape) -> Contact;

/// Table entry: a handler plus whether it was installed as the mirror of
/// another registration and must be called with swapped arguments.
#[derive(Copy, Clone)]
pub struct Handler {
    func: HandlerFn,
    swapped: bool,
}

impl Handler {
    pub fn new(func: HandlerFn) -> Self {
        Self { func, swapped: false }
    }

    fn mirrored(func: HandlerFn) -> Self {
        Self { func, swapped: true }
    }

    pub fn is_mirror(&self) -> bool {
        self.swapped
    }

    pub fn call(&self, first: &CollisionShape, second: &CollisionShape) -> Contact {
        if self.swapped {
            (self.func)(second, first)
        } else {
            (self.func)(first, second)
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("func", &(self.func as *const ()))
            .field("swapped", &self.swapped)
            .finish()
    }
}

/// Handlers for one source shape kind, indexed by the other shape's kind.
pub type HandlerRow = [Option<Handler>; ShapeId::COUNT];

/// Dispatch table from shape-kind pairs to collision handlers.
#[derive(Clone, Debug)]
pub struct CollisionResolver {
    table: [HandlerRow; ShapeId::COUNT],
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionResolver {
    /// Empty table; every test misses until handlers are registered.
    pub fn new() -> Self {
        Self {
            table: [[None; ShapeId::COUNT]; ShapeId::COUNT],
        }
    }

    /// Table with every built-in pair registered.
    pub fn with_builtin_handlers() -> Self {
        let mut resolver = Self::new();
        for (first, second, func) in pairs::BUILTIN {
            resolver.set_handler(first, second, func);
        }
        resolver
    }

    /// Register `func` for `(first, second)` and its mirror for
    /// `(second, first)`. Replaces whatever was there.
    pub fn set_handler(&mut self, first: ShapeId, second: ShapeId, func: HandlerFn) {
        debug!("collision handler registered: {first} vs {second}");
        self.table[first.index()][second.index()] = Some(Handler::new(func));
        if first != second {
            self.table[second.index()][first.index()] = Some(Handler::mirrored(func));
        }
    }

    pub fn handler(&self, first: ShapeId, second: ShapeId) -> Option<Handler> {
        self.table[first.index()][second.index()]
    }

    /// Every handler usable with `shape` as the first argument, or `None`
    /// when nothing is registered for its kind.
    pub fn handlers(&self, shape: &CollisionShape) -> Option<&HandlerRow> {
        let row = &self.table[shape.shape_id().index()];
        row.iter().any(Option::is_some).then_some(row)
    }

    /// Test two shapes. A missing handler is logged and counts as no collision.
    pub fn test<'a>(
        &self,
        first: &'a CollisionShape,
        second: &'a CollisionShape,
    ) -> Option<CollisionTestResult<'a>> {
        let handler = self.handler(first.shape_id(), second.shape_id());
        self.test_with_handler(first, second, handler)
    }

    /// Test two shapes with a handler fetched beforehand (usually from a
    /// `handlers` row, to skip the lookup in tight loops).
    pub fn test_with_handler<'a>(
        &self,
        first: &'a CollisionShape,
        second: &'a CollisionShape,
        handler: Option<Handler>,
    ) -> Option<CollisionTestResult<'a>> {
        let Some(handler) = handler else {
            warn!(
                "missing collision handler for shapes \"{}\" and \"{}\"",
                first.shape_id(),
                second.shape_id()
            );
            return None;
        };
        let position = match handler.call(first, second) {
            Contact::Miss => return None,
            Contact::Overlap => None,
            Contact::Point(p) => Some(p),
        };
        Some(CollisionTestResult { position, first, second })
    }
}
