use glam::{IVec2, UVec2, Vec2};
use gridbonk::*;

/// Prints every draw call instead of rendering.
struct PrintRenderer;

impl DebugRenderer for PrintRenderer {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        println!("  rect  {:?} alpha={:.2}", rect, color.a);
    }

    fn draw_circle(&mut self, circle: Circle, color: Color, segments: u32) {
        println!("  circle {:?} segments={} alpha={:.2}", circle, segments, color.a);
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color) {
        println!("  line  {} -> {} alpha={:.2}", from, to, color.a);
    }
}

fn main() -> Result<(), CollisionError> {
    env_logger::init();

    let collision = Collision::new();
    let mut world = collision.create_world(WorldConfig::uniform(100.0));

    let player = world.add_shape(collision.circle(Vec2::new(50.0, 50.0), 12.0).with_user_key(1))?;
    world.add_shape(collision.rect(Rect::new(120.0, 20.0, 40.0, 80.0)).with_user_key(2))?;
    world.add_shape(
        collision
            .lines([Line::new(Vec2::new(0.0, 150.0), Vec2::new(250.0, 180.0))])
            .with_user_key(3),
    )?;

    let mut walls = TilemapShape::new(Vec2::new(0.0, 200.0), UVec2::new(8, 2), Vec2::splat(32.0), 4.0);
    for x in 0..8 {
        walls.set_tile(IVec2::new(x, 1), true, Some(0b10))?;
    }
    world.add_shape(CollisionShape::tilemap(walls).with_user_key(4))?;

    for (pos, radius) in [
        (Vec2::new(55.0, 55.0), 0.0),
        (Vec2::new(130.0, 60.0), 30.0),
        (Vec2::new(100.0, 165.0), 1.0),
        (Vec2::new(40.0, 250.0), 0.0),
    ] {
        let keys: Vec<_> = world
            .pick(pos, radius, true, None, None)
            .iter()
            .map(|s| s.user_key)
            .collect();
        println!("pick {pos} r={radius}: {keys:?}");
    }

    // Walk the player right until it touches something.
    for step in 0..10 {
        if let Some(ShapeKind::Circle(c)) = world.shape_mut(player).map(|s| s.kind_mut()) {
            let moved = Circle::new(c.circle().center + Vec2::new(10.0, 0.0), c.circle().radius);
            c.set_circle(moved);
        }
        if let Some(hit) = world.test_collision(player, true, None, None) {
            println!("step {step}: player hit shape {:?}", hit.second.user_key);
            break;
        }
    }

    println!("debug draw:");
    world.debug_draw(&mut PrintRenderer, Rect::new(0.0, 0.0, 200.0, 200.0), None, None, 1.0);
    println!("{:?}", world.stats());
    Ok(())
}
