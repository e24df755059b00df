//! Ray casting against a small scene: closest hit and all-hits queries.

use rigid2d::prelude::*;

fn main() {
    let mut world = World::new(WorldDef::default());

    for i in 0..5 {
        let body = world.create_body(
            BodyBuilder::new()
                .position([i as f32 * 3.0, 0.0])
                .build(),
        );
        let shape: Shape = if i % 2 == 0 {
            shapes::box_polygon(0.5, 0.5).into()
        } else {
            shapes::circle([0.0, 0.0], 0.5).into()
        };
        world.create_fixture(body, &FixtureDef::builder().build(), shape);
    }

    let p1 = Vec2::new(-5.0, 0.0);
    let p2 = Vec2::new(20.0, 0.0);

    if let Some(hit) = world.cast_ray_closest(p1, p2, QueryFilter::default()) {
        println!(
            "closest: fixture {:?} at ({:.2}, {:.2}) normal ({:.2}, {:.2}) fraction {:.3}",
            hit.fixture, hit.point.x, hit.point.y, hit.normal.x, hit.normal.y, hit.fraction
        );
    }

    println!("all hits:");
    world.ray_cast(p1, p2, |fixture, point, _normal, fraction| {
        println!(
            "  fixture {:?} at ({:.2}, {:.2}) fraction {:.3}",
            fixture, point.x, point.y, fraction
        );
        // Keep scanning past every hit.
        1.0
    });
}
