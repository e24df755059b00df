use std::cell::RefCell;
use std::rc::Rc;

use rigid2d::prelude::*;
use rigid2d::{Contact, ContactListener};

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

fn static_box(world: &mut World, pos: [f32; 2], hx: f32, hy: f32) -> (BodyId, FixtureId) {
    let body = world.create_body(BodyBuilder::new().position(pos).build());
    let fixture = world.create_fixture(
        body,
        &FixtureDef::builder().build(),
        shapes::box_polygon(hx, hy).into(),
    );
    (body, fixture)
}

#[test]
fn overlap_aabb_finds_fixtures() {
    let mut world = World::new(WorldDef::default());
    let (_, near) = static_box(&mut world, [0.0, 0.0], 0.5, 0.5);
    let (_, far) = static_box(&mut world, [10.0, 0.0], 0.5, 0.5);

    let hits = world.overlap_aabb(
        Aabb::from_center_half_extents([0.0, 0.0], [2.0, 2.0]),
        QueryFilter::default(),
    );
    assert!(hits.contains(&near));
    assert!(!hits.contains(&far));

    let all = world.overlap_aabb(
        Aabb::from_center_half_extents([5.0, 0.0], [10.0, 2.0]),
        QueryFilter::default(),
    );
    assert_eq!(all.len(), 2);
}

#[test]
fn query_aabb_early_termination() {
    let mut world = World::new(WorldDef::default());
    for i in 0..5 {
        static_box(&mut world, [i as f32 * 2.0, 0.0], 0.5, 0.5);
    }

    let mut visits = 0;
    world.query_aabb(
        Aabb::from_center_half_extents([4.0, 0.0], [10.0, 1.0]),
        |_| {
            visits += 1;
            false
        },
    );
    assert_eq!(visits, 1);
}

#[test]
fn ray_cast_closest_and_protocol() {
    let mut world = World::new(WorldDef::default());
    let (_, first) = static_box(&mut world, [2.0, 0.0], 0.5, 0.5);
    let (_, second) = static_box(&mut world, [6.0, 0.0], 0.5, 0.5);

    let hit = world
        .cast_ray_closest(Vec2::new(-2.0, 0.0), Vec2::new(10.0, 0.0), QueryFilter::default())
        .expect("ray should hit");
    assert_eq!(hit.fixture, first);
    assert!(approx(hit.point.x, 1.5, 1e-3));
    assert!(approx(hit.normal.x, -1.0, 1e-4));

    // Skipping the first box by returning -1 finds the second.
    let mut fixtures_hit = Vec::new();
    world.ray_cast(Vec2::new(-2.0, 0.0), Vec2::new(10.0, 0.0), |fixture, _, _, _| {
        fixtures_hit.push(fixture);
        if fixture == first {
            -1.0
        } else {
            0.0
        }
    });
    assert!(fixtures_hit.contains(&second));

    // A miss reports nothing.
    assert!(world
        .cast_ray_closest(Vec2::new(-2.0, 5.0), Vec2::new(10.0, 5.0), QueryFilter::default())
        .is_none());
}

#[derive(Default)]
struct TouchCounter {
    begins: usize,
    ends: usize,
}

struct CountingListener(Rc<RefCell<TouchCounter>>);

impl ContactListener for CountingListener {
    fn begin_contact(&mut self, _contact: &mut Contact) {
        self.0.borrow_mut().begins += 1;
    }
    fn end_contact(&mut self, _contact: &mut Contact) {
        self.0.borrow_mut().ends += 1;
    }
}

#[test]
fn sensors_report_but_do_not_collide() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let counter = Rc::new(RefCell::new(TouchCounter::default()));
    world.set_contact_listener(CountingListener(counter.clone()));

    // A sensor plate below a falling ball.
    let plate = world.create_body(BodyBuilder::new().position([0.0, 0.0]).build());
    world.create_fixture(
        plate,
        &FixtureDef::builder().sensor(true).build(),
        shapes::box_polygon(2.0, 0.25).into(),
    );

    let ball = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 5.0])
            .build(),
    );
    world.create_fixture(
        ball,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );

    for _ in 0..240 {
        world.step(1.0 / 60.0, 8, 3);
    }

    // The ball passed straight through and both events fired.
    assert!(world.body(ball).position().y < -2.0);
    assert_eq!(counter.borrow().begins, 1);
    assert_eq!(counter.borrow().ends, 1);
}

#[test]
fn filter_groups_control_collision() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    let ground = world.create_body(BodyBuilder::new().position([0.0, -5.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(20.0, 1.0).into(),
    );

    // Negative shared group: the two balls ignore each other but not the
    // ground.
    let filter = Filter {
        group_index: -2,
        ..Filter::default()
    };
    let make_ball = |world: &mut World, x: f32| {
        let ball = world.create_body(
            BodyBuilder::new()
                .body_type(BodyType::Dynamic)
                .position([x, 0.0])
                .build(),
        );
        world.create_fixture(
            ball,
            &FixtureDef::builder().density(1.0).filter(filter).build(),
            shapes::circle([0.0, 0.0], 0.5).into(),
        );
        ball
    };
    let left = make_ball(&mut world, -0.25);
    let right = make_ball(&mut world, 0.25);

    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
    }

    // Overlapping rest poses prove the pair never collided.
    let dist = world.body(left).position().distance(world.body(right).position());
    assert!(dist < 0.9);
    // But both rest on the ground.
    assert!(approx(world.body(left).position().y, -3.5, 0.1));
    assert!(approx(world.body(right).position().y, -3.5, 0.1));
}

#[test]
fn category_mask_filtering() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    // Ground only collides with category 2.
    let ground = world.create_body(BodyBuilder::new().position([0.0, -5.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder()
            .filter(Filter {
                category_bits: 0x0001,
                mask_bits: 0x0002,
                group_index: 0,
            })
            .build(),
        shapes::box_polygon(20.0, 1.0).into(),
    );

    let ghost = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 0.0])
            .build(),
    );
    world.create_fixture(
        ghost,
        &FixtureDef::builder()
            .density(1.0)
            .filter(Filter {
                category_bits: 0x0004,
                mask_bits: u32::MAX,
                group_index: 0,
            })
            .build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );

    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
    }
    // Wrong category: falls straight through.
    assert!(world.body(ghost).position().y < -5.0);
}

#[test]
fn destroy_body_cascades() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    let ground = world.create_body(BodyBuilder::new().position([0.0, -2.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(10.0, 1.0).into(),
    );

    let a = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 0.0])
            .build(),
    );
    world.create_fixture(
        a,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(0.5, 0.5).into(),
    );

    let b = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([2.0, 0.0])
            .build(),
    );
    world.create_fixture(
        b,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(0.5, 0.5).into(),
    );

    world.create_distance_joint(&DistanceJointDef::new(JointBase::new(a, b)).length(2.0));

    // Settle into contact with the ground.
    for _ in 0..60 {
        world.step(1.0 / 60.0, 8, 3);
    }
    assert!(world.contact_count() > 0);
    assert_eq!(world.joint_count(), 1);

    world.destroy_body(a);
    assert_eq!(world.body_count(), 2);
    assert_eq!(world.joint_count(), 0);
    // No contact may reference the destroyed body's fixtures.
    for id in world.contact_ids() {
        let contact = world.contact(id);
        let fa = world.fixture(contact.fixture_a());
        let fb = world.fixture(contact.fixture_b());
        assert_ne!(fa.body(), a);
        assert_ne!(fb.body(), a);
    }

    // The remaining body still simulates.
    for _ in 0..60 {
        world.step(1.0 / 60.0, 8, 3);
    }
}
