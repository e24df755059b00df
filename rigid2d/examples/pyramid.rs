//! Pyramid stack: a classic stability scene. Prints the apex position while
//! the stack settles.

use rigid2d::prelude::*;

fn main() {
    env_logger::init();

    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    let ground = world.create_body(BodyBuilder::new().position([0.0, -10.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(50.0, 10.0).into(),
    );

    let rows = 12usize;
    let half = 0.5f32;
    let fixture_def = FixtureDef::builder().density(1.0).friction(0.5).build();

    let mut apex = None;
    for row in 0..rows {
        let count = rows - row;
        let y = half + 2.0 * half * row as f32;
        for i in 0..count {
            let x = (i as f32 - (count as f32 - 1.0) * 0.5) * 2.0 * half;
            let body = world.create_body(
                BodyBuilder::new()
                    .body_type(BodyType::Dynamic)
                    .position([x, y])
                    .build(),
            );
            world.create_fixture(body, &fixture_def, shapes::box_polygon(half, half).into());
            apex = Some(body);
        }
    }
    let apex = apex.unwrap();

    for step in 0..240 {
        world.step(1.0 / 60.0, 8, 3);
        if step % 60 == 0 {
            let pos = world.body(apex).position();
            println!(
                "t={:4.1}s apex=({:6.3}, {:6.3}) awake={}",
                step as f32 / 60.0,
                pos.x,
                pos.y,
                world.awake_body_count()
            );
        }
    }

    let pos = world.body(apex).position();
    println!("final apex position: ({:.3}, {:.3})", pos.x, pos.y);
}
