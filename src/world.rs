use std::collections::hash_map::Entry;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use fxhash::{FxHashMap, FxHashSet};
use glam::Vec2;
use log::{debug, trace, warn};
use slotmap::{SecondaryMap, SlotMap};

use crate::api::{CollisionWorldApi, DebugRenderer};
use crate::error::{CollisionError, CollisionResult};
use crate::geometry::{Circle, Rect};
use crate::resolver::{CollisionResolver, Handler, HandlerRow};
use crate::shapes::CollisionShape;
use crate::types::*;

const MIN_CELL_SIZE: f32 = 1e-5;

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

type Cell = (i32, i32);

/// Persistent collision world: owns its shapes and buckets them into a
/// uniform grid by bounding box. Geometry edits are applied lazily, on the
/// next flush.
#[derive(Debug)]
pub struct CollisionWorld {
    id: WorldId,
    cell_size: Vec2,
    resolver: Rc<CollisionResolver>,

    shapes: SlotMap<ShapeKey, CollisionShape>,
    // Cells each shape was inserted into at its last re-index.
    ranges: SecondaryMap<ShapeKey, CellRange>,
    grid: FxHashMap<Cell, Vec<ShapeKey>>,

    shapes_to_update: FxHashSet<ShapeKey>,
    cells_to_delete: FxHashSet<Cell>,

    stats: WorldStats,
}

impl CollisionWorldApi for CollisionWorld {
    fn new(resolver: Rc<CollisionResolver>, cfg: WorldConfig) -> Self {
        let id = WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed));
        let cell_size = cfg.cell_size.max(Vec2::splat(MIN_CELL_SIZE));
        debug!("collision world {id} created (cell size {cell_size})");
        Self {
            id,
            cell_size,
            resolver,
            shapes: SlotMap::with_key(),
            ranges: SecondaryMap::new(),
            grid: FxHashMap::default(),
            shapes_to_update: FxHashSet::default(),
            cells_to_delete: FxHashSet::default(),
            stats: WorldStats::default(),
        }
    }

    fn add_shape(&mut self, mut shape: CollisionShape) -> CollisionResult<ShapeHandle> {
        if let Some(owner) = shape.handle() {
            return Err(CollisionError::AlreadyInWorld { world: owner.world });
        }
        let world = self.id;
        let key = self.shapes.insert_with_key(|key| {
            shape.set_handle(Some(ShapeHandle { world, key }));
            shape
        });
        self.update_shape(key);
        self.flush();
        Ok(ShapeHandle { world, key })
    }

    fn remove_shape(&mut self, handle: ShapeHandle) -> Option<CollisionShape> {
        let removed = if handle.world == self.id {
            self.shapes.remove(handle.key)
        } else {
            None
        };
        let Some(mut shape) = removed else {
            warn!("shape to remove is not in collision world {}", self.id);
            return None;
        };

        if let Some(range) = self.ranges.remove(handle.key) {
            for cell in range.cells() {
                self.remove_from_cell(cell, handle.key);
            }
        }
        self.shapes_to_update.remove(&handle.key);
        shape.set_handle(None);
        self.flush();
        Some(shape)
    }

    fn flush(&mut self) {
        if !self.shapes_to_update.is_empty() {
            let pending = std::mem::take(&mut self.shapes_to_update);
            trace!("world {}: re-indexing {} shapes", self.id, pending.len());
            for key in pending {
                self.update_shape(key);
            }
        }

        if !self.cells_to_delete.is_empty() {
            for cell in self.cells_to_delete.drain() {
                if self.grid.get(&cell).is_some_and(Vec::is_empty) {
                    self.grid.remove(&cell);
                    self.stats.deleted_grid_cells += 1;
                }
            }
        }
    }

    fn iterate_shapes(&self, callback: &mut dyn FnMut(&CollisionShape) -> bool) {
        for shape in self.shapes.values() {
            if !callback(shape) {
                return;
            }
        }
    }

    fn test_collision<'a>(
        &'a mut self,
        source: impl Into<QuerySource<'a>>,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
    ) -> Option<CollisionTestResult<'a>> {
        let mut scan = self.scan();
        let first = scan.resolve(source.into())?;
        let (position, second) = scan.first_match(first, sort_by_distance, mask, predicate)?;
        Some(CollisionTestResult { position, first, second })
    }

    fn test_collision_many<'a>(
        &'a mut self,
        source: impl Into<QuerySource<'a>>,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
        on_each: Option<&mut dyn FnMut(&CollisionTestResult<'_>) -> bool>,
    ) -> Vec<CollisionTestResult<'a>> {
        let mut scan = self.scan();
        let Some(first) = scan.resolve(source.into()) else {
            return Vec::new();
        };
        scan.all_matches(first, sort_by_distance, mask, predicate, on_each)
            .into_iter()
            .map(|(position, second)| CollisionTestResult { position, first, second })
            .collect()
    }

    fn pick<'a>(
        &'a mut self,
        position: Vec2,
        radius: f32,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
    ) -> Vec<&'a CollisionShape> {
        let probe = if radius <= 1.0 {
            CollisionShape::point(position)
        } else {
            CollisionShape::circle(Circle::new(position, radius))
        };
        let mut scan = self.scan();
        scan.all_matches(&probe, sort_by_distance, mask, predicate, None)
            .into_iter()
            .map(|(_, shape)| shape)
            .collect()
    }

    fn debug_draw(
        &mut self,
        renderer: &mut dyn DebugRenderer,
        region: Rect,
        grid_color: Option<Color>,
        highlight_color: Option<Color>,
        opacity: f32,
    ) {
        self.flush();

        let grid_color = grid_color
            .unwrap_or(Color::BLACK.faded(0.75))
            .faded(opacity * 0.75);
        let highlight_color = highlight_color
            .unwrap_or(Color::RED.faded(0.75))
            .faded(opacity * 0.75);

        let cs = self.cell_size;
        let min_x = (region.left() / cs.x).floor() as i32;
        let min_y = (region.top() / cs.y).floor() as i32;
        let max_x = min_x.saturating_add((region.width / cs.x).ceil() as i32);
        let max_y = min_y.saturating_add((region.height / cs.y).ceil() as i32);

        let mut drawn = FxHashSet::default();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                let keys = self.grid.get(&(x, y)).map_or(&[][..], Vec::as_slice);
                let color = if keys.is_empty() { grid_color } else { highlight_color };
                let (left, top) = (x as f32 * cs.x, y as f32 * cs.y);
                renderer.fill_rect(Rect::new(left, top, cs.x, 2.0), color);
                renderer.fill_rect(Rect::new(left, top, 2.0, cs.y), color);

                for &key in keys {
                    if !drawn.insert(key) {
                        continue;
                    }
                    if let Some(shape) = self.shapes.get(key) {
                        shape.debug_draw(opacity, renderer);
                    }
                }
            }
        }
    }

    fn stats(&self) -> &WorldStats {
        &self.stats
    }

    fn reset_stats(&mut self) {
        self.stats = WorldStats::default();
    }
}

impl CollisionWorld {
    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    pub fn resolver(&self) -> &Rc<CollisionResolver> {
        &self.resolver
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn contains(&self, handle: ShapeHandle) -> bool {
        handle.world == self.id && self.shapes.contains_key(handle.key)
    }

    pub fn shape(&self, handle: ShapeHandle) -> Option<&CollisionShape> {
        if handle.world != self.id {
            return None;
        }
        self.shapes.get(handle.key)
    }

    /// Mutable access to a stored shape. The shape is re-indexed on the next
    /// flush, so grid queries see the edit only after that.
    pub fn shape_mut(&mut self, handle: ShapeHandle) -> Option<&mut CollisionShape> {
        if !self.contains(handle) {
            return None;
        }
        self.queue_update(handle.key);
        self.shapes.get_mut(handle.key)
    }

    pub fn shapes(&self) -> impl Iterator<Item = (ShapeHandle, &CollisionShape)> + '_ {
        let world = self.id;
        self.shapes
            .iter()
            .map(move |(key, shape)| (ShapeHandle { world, key }, shape))
    }

    pub(crate) fn queue_update(&mut self, key: ShapeKey) {
        self.shapes_to_update.insert(key);
    }

    /// Allocated grid cells, including emptied ones awaiting a flush.
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// Keys of the shapes in a grid cell, in insertion order.
    pub fn cell_shapes(&self, x: i32, y: i32) -> &[ShapeKey] {
        self.grid.get(&(x, y)).map_or(&[][..], Vec::as_slice)
    }

    /// Cells a shape was placed in at its last re-index.
    pub fn cell_range_of(&self, handle: ShapeHandle) -> Option<CellRange> {
        if handle.world != self.id {
            return None;
        }
        self.ranges.get(handle.key).copied()
    }

    /// Cell range covering a bounding box.
    pub fn cell_range(&self, bounds: Rect) -> CellRange {
        cell_range(bounds, self.cell_size)
    }

    fn update_shape(&mut self, key: ShapeKey) {
        let Some(shape) = self.shapes.get(key) else {
            return;
        };
        self.stats.updated_shapes += 1;

        let new_range = cell_range(shape.bounding_box(), self.cell_size);
        match self.ranges.get(key).copied() {
            Some(old_range) if old_range == new_range => return,
            Some(old_range) => {
                for (x, y) in old_range.cells() {
                    if !new_range.contains(x, y) {
                        self.remove_from_cell((x, y), key);
                    }
                }
                for (x, y) in new_range.cells() {
                    if !old_range.contains(x, y) {
                        self.insert_into_cell((x, y), key);
                    }
                }
            }
            None => {
                self.stats.added_shapes += 1;
                for cell in new_range.cells() {
                    self.insert_into_cell(cell, key);
                }
            }
        }
        self.ranges.insert(key, new_range);
    }

    fn insert_into_cell(&mut self, cell: Cell, key: ShapeKey) {
        match self.grid.entry(cell) {
            Entry::Occupied(e) => e.into_mut().push(key),
            Entry::Vacant(e) => {
                self.stats.created_grid_cells += 1;
                e.insert(vec![key]);
            }
        }
    }

    fn remove_from_cell(&mut self, cell: Cell, key: ShapeKey) {
        if let Some(keys) = self.grid.get_mut(&cell) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.cells_to_delete.insert(cell);
            }
        }
    }

    /// Flush, then split the world into the borrows a query needs.
    fn scan(&mut self) -> Scan<'_> {
        self.flush();
        Scan {
            world: self.id,
            cell_size: self.cell_size,
            grid: &self.grid,
            shapes: &self.shapes,
            resolver: &self.resolver,
            stats: &mut self.stats,
        }
    }
}

/// Grid cells overlapped by `bounds`: floored mins, ceiled maxes, at least
/// one cell per axis so zero-size shapes are still indexed.
fn cell_range(bounds: Rect, cell_size: Vec2) -> CellRange {
    let min_x = (bounds.left() / cell_size.x).floor() as i32;
    let min_y = (bounds.top() / cell_size.y).floor() as i32;
    let max_x = ((bounds.right() / cell_size.x).ceil() as i32).max(min_x.saturating_add(1));
    let max_y = ((bounds.bottom() / cell_size.y).ceil() as i32).max(min_y.saturating_add(1));
    CellRange { min_x, min_y, max_x, max_y }
}

/// Approximate nearest-reach distance used to order query results.
fn reach(origin: Vec2, shape: &CollisionShape) -> f32 {
    shape.center().distance(origin) - shape.radius()
}

fn handler_for(row: Option<&HandlerRow>, other: &CollisionShape) -> Option<Handler> {
    row.and_then(|row| row[other.shape_id().index()])
}

/// Read-only view of a flushed world plus its stats, for the duration of
/// one query.
struct Scan<'w> {
    world: WorldId,
    cell_size: Vec2,
    grid: &'w FxHashMap<Cell, Vec<ShapeKey>>,
    shapes: &'w SlotMap<ShapeKey, CollisionShape>,
    resolver: &'w CollisionResolver,
    stats: &'w mut WorldStats,
}

impl<'w> Scan<'w> {
    fn resolve<'s>(&self, source: QuerySource<'s>) -> Option<&'s CollisionShape>
    where
        'w: 's,
    {
        match source {
            QuerySource::Shape(shape) => Some(shape),
            QuerySource::Handle(handle) => {
                let shapes = self.shapes;
                let found = if handle.world == self.world {
                    shapes.get(handle.key)
                } else {
                    None
                };
                if found.is_none() {
                    warn!("query source is not a shape of collision world {}", self.world);
                }
                found
            }
        }
    }

    /// Visit every candidate sharing a cell with `source` once. Skips
    /// `source` itself and shapes without a common flag bit with `mask`
    /// (`None` or 0 matches all) before consulting `predicate`.
    fn broad_phase(
        &mut self,
        source: &CollisionShape,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
        mut visit: impl FnMut(&'w CollisionShape, &mut WorldStats) -> bool,
    ) {
        let range = cell_range(source.bounding_box(), self.cell_size);
        self.stats.broad_phase_calls += 1;

        let own_key = source
            .handle()
            .filter(|h| h.world == self.world)
            .map(|h| h.key);
        let mask = mask.filter(|m| *m != 0);
        let (grid, shapes) = (self.grid, self.shapes);
        let mut checked = FxHashSet::default();

        for cell in range.cells() {
            let Some(keys) = grid.get(&cell) else {
                continue;
            };
            for &key in keys {
                if !checked.insert(key) || Some(key) == own_key {
                    continue;
                }
                let Some(other) = shapes.get(key) else {
                    continue;
                };
                if mask.is_some_and(|m| other.collision_flags & m == 0) {
                    continue;
                }
                self.stats.broad_phase_shapes_checks_pre_predicate += 1;
                if predicate.is_some_and(|p| !p(other)) {
                    continue;
                }
                self.stats.broad_phase_shapes_checks_post_predicate += 1;
                if !visit(other, &mut *self.stats) {
                    return;
                }
            }
        }
    }

    fn first_match(
        &mut self,
        source: &CollisionShape,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
    ) -> Option<(Option<Vec2>, &'w CollisionShape)> {
        let resolver = self.resolver;
        let row = resolver.handlers(source);

        if sort_by_distance {
            let mut candidates = Vec::new();
            self.broad_phase(source, mask, predicate, |other, _| {
                candidates.push(other);
                true
            });
            let origin = source.center();
            candidates.sort_by(|a, b| reach(origin, a).total_cmp(&reach(origin, b)));

            for other in candidates {
                self.stats.collision_checks += 1;
                if let Some(hit) = resolver.test_with_handler(source, other, handler_for(row, other)) {
                    self.stats.collision_matches += 1;
                    return Some((hit.position, other));
                }
            }
            return None;
        }

        let mut found = None;
        self.broad_phase(source, mask, predicate, |other, stats| {
            stats.collision_checks += 1;
            match resolver.test_with_handler(source, other, handler_for(row, other)) {
                Some(hit) => {
                    stats.collision_matches += 1;
                    found = Some((hit.position, other));
                    false
                }
                None => true,
            }
        });
        found
    }

    fn all_matches(
        &mut self,
        source: &CollisionShape,
        sort_by_distance: bool,
        mask: Option<u32>,
        predicate: Option<&dyn Fn(&CollisionShape) -> bool>,
        mut on_each: Option<&mut dyn FnMut(&CollisionTestResult<'_>) -> bool>,
    ) -> Vec<(Option<Vec2>, &'w CollisionShape)> {
        let resolver = self.resolver;
        let row = resolver.handlers(source);

        let mut matches = Vec::new();
        self.broad_phase(source, mask, predicate, |other, stats| {
            stats.collision_checks += 1;
            let Some(hit) = resolver.test_with_handler(source, other, handler_for(row, other))
            else {
                return true;
            };
            stats.collision_matches += 1;
            matches.push((hit.position, other));
            match on_each.as_mut() {
                Some(on_each) => on_each(&hit),
                None => true,
            }
        });

        if sort_by_distance {
            let origin = source.center();
            matches.sort_by(|(_, a), (_, b)| reach(origin, a).total_cmp(&reach(origin, b)));
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Line;

    fn world(cell_size: f32) -> CollisionWorld {
        CollisionWorld::new(
            Rc::new(CollisionResolver::with_builtin_handlers()),
            WorldConfig::uniform(cell_size),
        )
    }

    fn set_rect(w: &mut CollisionWorld, h: ShapeHandle, rect: Rect) {
        let shape = w.shape_mut(h).unwrap();
        let crate::shapes::ShapeKind::Rect(r) = shape.kind_mut() else {
            panic!("not a rect");
        };
        r.set_rect(rect);
    }

    #[test]
    fn test_cell_range_straddling_origin() {
        let mut w = world(1.0);
        let h = w
            .add_shape(CollisionShape::rect(Rect::new(-0.5, -0.5, 1.0, 1.0)))
            .unwrap();
        // Floor/ceil indexing: bounds straddling the origin cover 4 cells.
        assert_eq!(w.cell_count(), 4);
        for (x, y) in [(-1, -1), (-1, 0), (0, -1), (0, 0)] {
            assert_eq!(w.cell_shapes(x, y), &[h.key]);
        }
        assert_eq!(
            w.cell_range_of(h),
            Some(CellRange { min_x: -1, min_y: -1, max_x: 1, max_y: 1 })
        );
    }

    #[test]
    fn test_cell_range_widens_degenerate_bounds() {
        let r = cell_range(Rect::new(10.0, 10.0, 0.0, 0.0), Vec2::splat(10.0));
        assert_eq!(r, CellRange { min_x: 1, min_y: 1, max_x: 2, max_y: 2 });
        let r = cell_range(Rect::new(0.0, 0.0, 100.0, 100.0), Vec2::splat(100.0));
        assert_eq!(r.cell_count(), 1);
    }

    #[test]
    fn test_add_sets_handle_and_stats() {
        let mut w = world(100.0);
        let h = w
            .add_shape(CollisionShape::rect(Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        assert_eq!(h.world, w.id());
        assert_eq!(w.shape(h).unwrap().handle(), Some(h));
        assert_eq!(w.len(), 1);
        assert_eq!(w.stats().added_shapes, 1);
        assert_eq!(w.stats().updated_shapes, 1);
        assert_eq!(w.stats().created_grid_cells, 1);
    }

    #[test]
    fn test_owned_shape_cannot_be_added_twice() {
        let mut a = world(100.0);
        let mut b = world(100.0);
        let h = a.add_shape(CollisionShape::point(Vec2::ZERO)).unwrap();
        let copy = a.shape(h).unwrap().clone();

        let err = b.add_shape(copy.clone()).unwrap_err();
        assert_eq!(err, CollisionError::AlreadyInWorld { world: a.id() });
        assert!(a.add_shape(copy).is_err());
        assert!(b.is_empty());
        assert_eq!(a.len(), 1);

        let detached = a.remove_shape(h).unwrap();
        assert!(detached.handle().is_none());
        assert!(b.add_shape(detached).is_ok());
    }

    #[test]
    fn test_same_range_update_is_noop() {
        let mut w = world(100.0);
        let h = w
            .add_shape(CollisionShape::rect(Rect::new(10.0, 10.0, 20.0, 20.0)))
            .unwrap();
        let before = *w.stats();

        set_rect(&mut w, h, Rect::new(12.0, 15.0, 20.0, 20.0));
        w.flush();

        let after = *w.stats();
        assert_eq!(after.updated_shapes, before.updated_shapes + 1);
        assert_eq!(after.created_grid_cells, before.created_grid_cells);
        assert_eq!(after.deleted_grid_cells, before.deleted_grid_cells);
        assert_eq!(w.cell_shapes(0, 0), &[h.key]);
    }

    #[test]
    fn test_move_updates_cells_and_drops_empty_ones() {
        let mut w = world(10.0);
        let h = w
            .add_shape(CollisionShape::rect(Rect::new(1.0, 1.0, 5.0, 5.0)))
            .unwrap();
        assert_eq!(w.cell_count(), 1);

        set_rect(&mut w, h, Rect::new(15.0, 1.0, 10.0, 5.0));
        // Not applied until a flush.
        assert_eq!(w.cell_shapes(0, 0), &[h.key]);
        w.flush();

        assert!(w.cell_shapes(0, 0).is_empty());
        assert_eq!(w.cell_shapes(1, 0), &[h.key]);
        assert_eq!(w.cell_shapes(2, 0), &[h.key]);
        assert_eq!(w.cell_count(), 2);
        assert_eq!(w.stats().created_grid_cells, 3);
        assert_eq!(w.stats().deleted_grid_cells, 1);
    }

    #[test]
    fn test_query_flushes_pending_moves() {
        let mut w = world(10.0);
        let h = w
            .add_shape(CollisionShape::rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        set_rect(&mut w, h, Rect::new(100.0, 100.0, 5.0, 5.0));

        let probe = CollisionShape::point(Vec2::new(102.0, 102.0));
        let hit = w.test_collision(&probe, false, None, None).unwrap();
        assert_eq!(hit.second.handle(), Some(h));
    }

    #[test]
    fn test_source_in_world_skips_itself() {
        let mut w = world(100.0);
        let a = w
            .add_shape(CollisionShape::circle(Circle::new(Vec2::ZERO, 10.0)))
            .unwrap();
        assert!(w.test_collision(a, false, None, None).is_none());

        let b = w
            .add_shape(CollisionShape::circle(Circle::new(Vec2::new(5.0, 0.0), 10.0)))
            .unwrap();
        let hit = w.test_collision(a, false, None, None).unwrap();
        assert_eq!(hit.first.handle(), Some(a));
        assert_eq!(hit.second.handle(), Some(b));
    }

    #[test]
    fn test_broad_phase_visits_multi_cell_shape_once() {
        let mut w = world(10.0);
        // Covers cells (0..2, 0..2).
        w.add_shape(CollisionShape::rect(Rect::new(1.0, 1.0, 15.0, 15.0)))
            .unwrap();
        let probe = CollisionShape::rect(Rect::new(0.0, 0.0, 20.0, 20.0));
        w.reset_stats();

        let hits = w.test_collision_many(&probe, false, None, None, None);
        assert_eq!(hits.len(), 1);
        let stats = w.stats();
        assert_eq!(stats.broad_phase_calls, 1);
        assert_eq!(stats.broad_phase_shapes_checks_pre_predicate, 1);
        assert_eq!(stats.collision_checks, 1);
        assert_eq!(stats.collision_matches, 1);
    }

    #[test]
    fn test_mask_and_predicate_filters() {
        let mut w = world(100.0);
        w.add_shape(CollisionShape::circle(Circle::new(Vec2::ZERO, 5.0)).with_flags(0b01))
            .unwrap();
        w.add_shape(
            CollisionShape::circle(Circle::new(Vec2::ONE, 5.0))
                .with_flags(0b10)
                .with_user_key(7),
        )
        .unwrap();
        let probe = CollisionShape::point(Vec2::new(1.0, 1.0));

        w.reset_stats();
        assert_eq!(w.test_collision_many(&probe, false, Some(0b10), None, None).len(), 1);
        assert_eq!(w.stats().broad_phase_shapes_checks_pre_predicate, 1);

        assert_eq!(w.test_collision_many(&probe, false, Some(0), None, None).len(), 2);

        w.reset_stats();
        let keyed = |s: &CollisionShape| s.user_key == Some(7);
        let hits = w.test_collision_many(&probe, false, None, Some(&keyed), None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].second.user_key, Some(7));
        let stats = w.stats();
        assert_eq!(stats.broad_phase_shapes_checks_pre_predicate, 2);
        assert_eq!(stats.broad_phase_shapes_checks_post_predicate, 1);
    }

    #[test]
    fn test_sorted_first_match_prefers_nearest_reach() {
        let mut w = world(1000.0);
        let _far = w
            .add_shape(CollisionShape::circle(Circle::new(Vec2::new(40.0, 0.0), 45.0)))
            .unwrap();
        let near = w
            .add_shape(CollisionShape::circle(Circle::new(Vec2::new(10.0, 0.0), 12.0)))
            .unwrap();
        let probe = CollisionShape::point(Vec2::ZERO);

        // Reach is -5 for the large circle and -2 for the small one, so the
        // large circle sorts first even though its center is farther away.
        let hit = w.test_collision(&probe, true, None, None).unwrap();
        assert_ne!(hit.second.handle(), Some(near));

        let hits = w.test_collision_many(&probe, true, None, None, None);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].second.handle(), Some(near));
    }

    #[test]
    fn test_on_each_stops_early_and_keeps_results() {
        let mut w = world(100.0);
        for i in 0..4 {
            w.add_shape(CollisionShape::circle(Circle::new(Vec2::new(i as f32, 0.0), 10.0)))
                .unwrap();
        }
        let probe = CollisionShape::point(Vec2::ZERO);
        let mut seen = 0;
        let mut stop_after_two = |_: &CollisionTestResult<'_>| {
            seen += 1;
            seen < 2
        };
        let hits = w.test_collision_many(&probe, false, None, None, Some(&mut stop_after_two));
        assert_eq!(hits.len(), 2);
        assert_eq!(w.stats().collision_checks, 2);
    }

    #[test]
    fn test_lines_shape_in_world() {
        let mut w = world(50.0);
        w.add_shape(CollisionShape::lines([Line::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(200.0, 0.0),
        )]))
        .unwrap();
        assert_eq!(w.cell_count(), 4);

        let probe = CollisionShape::point(Vec2::new(120.0, 0.2));
        let hit = w.test_collision(&probe, false, None, None).unwrap();
        assert_eq!(hit.position, Some(Vec2::new(120.0, 0.2)));
    }

    #[test]
    fn test_unknown_source_handle_yields_nothing() {
        let mut a = world(100.0);
        let mut b = world(100.0);
        a.add_shape(CollisionShape::point(Vec2::ZERO)).unwrap();
        let foreign = b.add_shape(CollisionShape::point(Vec2::ZERO)).unwrap();

        assert!(a.test_collision(foreign, false, None, None).is_none());
        assert!(a.test_collision_many(foreign, false, None, None, None).is_empty());
        assert!(a.shape_mut(foreign).is_none());
    }

    #[test]
    fn test_iterate_shapes_stops() {
        let mut w = world(100.0);
        for i in 0..5 {
            w.add_shape(CollisionShape::point(Vec2::splat(i as f32 * 300.0)))
                .unwrap();
        }
        let mut count = 0;
        w.iterate_shapes(&mut |_| {
            count += 1;
            count < 3
        });
        assert_eq!(count, 3);
        assert_eq!(w.shapes().count(), 5);
    }

    #[test]
    fn test_zero_cell_size_is_clamped() {
        let w = CollisionWorld::new(
            Rc::new(CollisionResolver::new()),
            WorldConfig { cell_size: Vec2::ZERO },
        );
        assert!(w.cell_size().x > 0.0 && w.cell_size().y > 0.0);
    }
}
