use glam::{IVec2, UVec2, Vec2};
use gridbonk::*;
use std::time::Instant;

fn main() -> Result<(), CollisionError> {
    env_logger::init();

    let collision = Collision::new();
    let mut world = collision.create_world(WorldConfig::uniform(512.0));

    // 256x256 map with ~25% solids in a checkerboard-ish pattern.
    let (w, h) = (256u32, 256u32);
    let mut map = TilemapShape::new(Vec2::ZERO, UVec2::new(w, h), Vec2::ONE, 2.0);
    for y in 0..h {
        for x in 0..w {
            if (x ^ y) & 0x3 == 0 {
                map.set_tile(IVec2::new(x as i32, y as i32), true, None)?;
            }
        }
    }
    println!("tiles set: {}", map.occupied_count());
    world.add_shape(CollisionShape::tilemap(map))?;

    let n_points = 200_000;
    let t0 = Instant::now();
    let mut point_hits = 0usize;
    for i in 0..n_points {
        let p = Vec2::new((i % 260) as f32 - 2.0 + 0.5, (i / 260 % 260) as f32 - 2.0 + 0.5);
        point_hits += world.pick(p, 0.0, false, None, None).len();
    }
    let dt = t0.elapsed().as_secs_f64();
    println!(
        "tile_points: n={} secs={:.3} throughput={:.0}/s hits={}",
        n_points,
        dt,
        n_points as f64 / dt,
        point_hits
    );

    let n_circles = 100_000;
    let t1 = Instant::now();
    let mut circle_hits = 0usize;
    for i in 0..n_circles {
        let a = i as f32 * 0.01;
        let probe = collision.circle(Vec2::new(128.0 + 100.0 * a.sin(), 128.0 + 100.0 * a.cos()), 0.4);
        if world.test_collision(&probe, false, None, None).is_some() {
            circle_hits += 1;
        }
    }
    let dt2 = t1.elapsed().as_secs_f64();
    println!(
        "tile_circles: n={} secs={:.3} throughput={:.0}/s hits={}",
        n_circles,
        dt2,
        n_circles as f64 / dt2,
        circle_hits
    );
    println!("{:?}", world.stats());
    Ok(())
}
