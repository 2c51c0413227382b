use glam::Vec2;
use gridbonk::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

fn main() {
    env_logger::init();

    let collision = Collision::new();
    let mut rng = StdRng::seed_from_u64(1);

    for cell_size in [16.0, 64.0, 256.0] {
        let mut world = collision.create_world(WorldConfig::uniform(cell_size));
        let n = 20_000usize;

        let t0 = Instant::now();
        let mut handles = Vec::with_capacity(n);
        for i in 0..n {
            let p = Vec2::new(rng.gen_range(-1000.0..1000.0), rng.gen_range(-1000.0..1000.0));
            let shape = if i % 2 == 0 {
                collision.rect(Rect::new(p.x, p.y, 6.0, 6.0))
            } else {
                collision.circle(p, 3.0)
            };
            if let Ok(h) = world.add_shape(shape) {
                handles.push(h);
            }
        }
        let t_add = t0.elapsed();

        // Move a tenth of the shapes, then let the first query flush them.
        let t1 = Instant::now();
        for h in handles.iter().step_by(10) {
            let delta = Vec2::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0));
            match world.shape_mut(*h).map(|s| s.kind_mut()) {
                Some(ShapeKind::Rect(r)) => {
                    let moved = Rect::new(r.rect().x + delta.x, r.rect().y + delta.y, 6.0, 6.0);
                    r.set_rect(moved);
                }
                Some(ShapeKind::Circle(c)) => {
                    let moved = Circle::new(c.circle().center + delta, 3.0);
                    c.set_circle(moved);
                }
                _ => {}
            }
        }
        world.flush();
        let t_move = t1.elapsed();

        let t2 = Instant::now();
        let mut hits = 0usize;
        for h in handles.iter().take(5_000) {
            hits += world.test_collision_many(*h, false, None, None, None).len();
        }
        let t_query = t2.elapsed();

        let s = world.stats();
        println!(
            "N={} cell_size={} add={:?} move={:?} query={:?} hits={} cells={} checks={} matches={}",
            n,
            cell_size,
            t_add,
            t_move,
            t_query,
            hits,
            world.cell_count(),
            s.collision_checks,
            s.collision_matches
        );
    }
}
