use std::cell::RefCell;
use std::rc::Rc;

use rigid2d::prelude::*;
use rigid2d::tuning;
use rigid2d::{Contact, ContactImpulse};

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

#[derive(Default)]
struct Recorder {
    begin_count: usize,
    end_count: usize,
    max_normal_impulse: f32,
}

struct RecordingListener(Rc<RefCell<Recorder>>);

impl ContactListener for RecordingListener {
    fn begin_contact(&mut self, _contact: &mut Contact) {
        self.0.borrow_mut().begin_count += 1;
    }
    fn end_contact(&mut self, _contact: &mut Contact) {
        self.0.borrow_mut().end_count += 1;
    }
    fn post_solve(&mut self, _contact: &mut Contact, impulse: &ContactImpulse) {
        let mut recorder = self.0.borrow_mut();
        for i in 0..impulse.count {
            recorder.max_normal_impulse =
                recorder.max_normal_impulse.max(impulse.normal_impulses[i]);
        }
    }
}

#[test]
fn head_on_circles_bounce() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, 0.0]).build());
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    world.set_contact_listener(RecordingListener(recorder.clone()));

    let fixture_def = FixtureDef::builder().density(1.0).restitution(1.0).build();

    let a = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([-5.0, 0.0])
            .linear_velocity([1.0, 0.0])
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(a, &fixture_def, shapes::circle([0.0, 0.0], 1.0).into());

    let b = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([5.0, 0.0])
            .linear_velocity([-1.0, 0.0])
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(b, &fixture_def, shapes::circle([0.0, 0.0], 1.0).into());

    // One frame of mutual travel can land before the solver sees overlap.
    let travel_per_step = 2.0 / 60.0;

    let mut first_touch_step = None;
    for i in 0..400 {
        world.step(1.0 / 60.0, 8, 3);

        // Penetration never exceeds one frame of travel plus the slop.
        let separation =
            world.body(a).position().distance(world.body(b).position()) - 2.0;
        assert!(separation >= -(travel_per_step + 3.0 * tuning::LINEAR_SLOP));

        if first_touch_step.is_none() && recorder.borrow().begin_count > 0 {
            first_touch_step = Some(i);
        }
    }

    let first_touch_step = first_touch_step.expect("circles never touched");
    assert!(first_touch_step < 300);
    assert!(recorder.borrow().max_normal_impulse > 0.0);

    // The collision reversed both velocities.
    assert!(world.body(a).linear_velocity().x < 0.0);
    assert!(world.body(b).linear_velocity().x > 0.0);
}

#[test]
fn falling_box_rests_on_ground() {
    // Mirror of the classic hello-world: final y ~ 1, small x and angle.
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    let ground = world.create_body(BodyBuilder::new().position([0.0, -10.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(50.0, 10.0).into(),
    );

    let body = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 4.0])
            .build(),
    );
    world.create_fixture(
        body,
        &FixtureDef::builder().density(1.0).friction(0.3).build(),
        shapes::box_polygon(1.0, 1.0).into(),
    );

    for _ in 0..90 {
        world.step(1.0 / 60.0, 8, 3);
    }

    let pos = world.body(body).position();
    let angle = world.body(body).angle();
    assert!(approx(pos.x, 0.0, 0.01));
    assert!(approx(pos.y, 1.0, 0.05));
    assert!(approx(angle, 0.0, 0.05));
}

#[test]
fn static_bodies_never_move() {
    let mut world = World::new(WorldDef::default());

    let wall = world.create_body(BodyBuilder::new().position([0.0, 0.0]).build());
    world.create_fixture(
        wall,
        &FixtureDef::builder().build(),
        shapes::box_polygon(1.0, 5.0).into(),
    );

    let ball = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 8.0])
            .build(),
    );
    world.create_fixture(
        ball,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );

    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
        let body = world.body(wall);
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.angular_velocity(), 0.0);
        assert_eq!(body.position(), Vec2::ZERO);
    }
}

#[test]
fn resting_body_falls_asleep() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    let ground = world.create_body(BodyBuilder::new().position([0.0, -10.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(50.0, 10.0).into(),
    );

    let body = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 0.5])
            .build(),
    );
    world.create_fixture(
        body,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(0.5, 0.5).into(),
    );

    // Plenty of time to settle and pass the sleep timer.
    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
    }
    assert!(!world.body(body).is_awake());
    assert_eq!(world.awake_body_count(), 0);

    // Poking it wakes it again.
    world.body_mut(body).apply_linear_impulse_to_center([2.0, 0.0], true);
    assert!(world.body(body).is_awake());
}

#[test]
fn bullet_does_not_tunnel_thin_wall() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, 0.0]).build());

    let wall = world.create_body(BodyBuilder::new().position([0.0, 0.0]).build());
    world.create_fixture(
        wall,
        &FixtureDef::builder().build(),
        shapes::box_polygon(0.05, 5.0).into(),
    );

    let bullet = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([-10.0, 0.0])
            .linear_velocity([200.0, 0.0])
            .bullet(true)
            .build(),
    );
    world.create_fixture(
        bullet,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.1).into(),
    );

    for _ in 0..30 {
        world.step(1.0 / 60.0, 8, 3);
    }

    // At 200 m/s a discrete step moves ~3.3 m per frame, far past the wall
    // thickness; continuous collision must stop it.
    assert!(world.body(bullet).position().x < 0.0);
}

#[test]
fn gravity_scale_and_damping() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    let floater = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 10.0])
            .gravity_scale(0.0)
            .build(),
    );
    world.create_fixture(
        floater,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );

    let damped = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([5.0, 10.0])
            .linear_velocity([10.0, 0.0])
            .ignore_gravity(true)
            .linear_damping(5.0)
            .build(),
    );
    world.create_fixture(
        damped,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );

    for _ in 0..60 {
        world.step(1.0 / 60.0, 8, 3);
    }

    assert!(approx(world.body(floater).position().y, 10.0, 1e-3));
    assert!(world.body(damped).linear_velocity().x < 1.0);
}
