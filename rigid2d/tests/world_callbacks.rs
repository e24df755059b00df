use std::cell::RefCell;
use std::rc::Rc;

use rigid2d::collision::Manifold;
use rigid2d::prelude::*;
use rigid2d::{Contact, ContactImpulse};

#[derive(Default)]
struct EventLog {
    order: Vec<&'static str>,
    pre_solve_count: usize,
    post_solve_count: usize,
    max_impulse: f32,
}

struct OrderListener(Rc<RefCell<EventLog>>);

impl ContactListener for OrderListener {
    fn begin_contact(&mut self, _contact: &mut Contact) {
        self.0.borrow_mut().order.push("begin");
    }
    fn end_contact(&mut self, _contact: &mut Contact) {
        self.0.borrow_mut().order.push("end");
    }
    fn pre_solve(&mut self, _contact: &mut Contact, _old_manifold: &Manifold) {
        let mut log = self.0.borrow_mut();
        log.order.push("pre");
        log.pre_solve_count += 1;
    }
    fn post_solve(&mut self, _contact: &mut Contact, impulse: &ContactImpulse) {
        let mut log = self.0.borrow_mut();
        log.order.push("post");
        log.post_solve_count += 1;
        for i in 0..impulse.count {
            log.max_impulse = log.max_impulse.max(impulse.normal_impulses[i]);
        }
    }
}

fn drop_ball_world(listener: impl ContactListener + 'static) -> (World, BodyId) {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    world.set_contact_listener(listener);

    let ground = world.create_body(BodyBuilder::new().position([0.0, -1.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(10.0, 1.0).into(),
    );

    let ball = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 2.0])
            .build(),
    );
    world.create_fixture(
        ball,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );
    (world, ball)
}

#[test]
fn callback_ordering() {
    let log = Rc::new(RefCell::new(EventLog::default()));
    let (mut world, _ball) = drop_ball_world(OrderListener(log.clone()));

    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
    }

    let log = log.borrow();
    assert!(log.pre_solve_count > 0);
    assert!(log.post_solve_count > 0);
    assert!(log.max_impulse > 0.0);

    // begin fires before the first pre-solve, which fires before post-solve.
    let begin = log.order.iter().position(|&e| e == "begin").unwrap();
    let pre = log.order.iter().position(|&e| e == "pre").unwrap();
    let post = log.order.iter().position(|&e| e == "post").unwrap();
    assert!(begin < pre);
    assert!(pre < post);
}

struct DisablingListener;

impl ContactListener for DisablingListener {
    fn pre_solve(&mut self, contact: &mut Contact, _old_manifold: &Manifold) {
        contact.set_enabled(false);
    }
}

#[test]
fn pre_solve_disable_skips_response() {
    let (mut world, ball) = drop_ball_world(DisablingListener);

    for _ in 0..240 {
        world.step(1.0 / 60.0, 8, 3);
    }

    // With every contact disabled before solving, the ball falls through.
    assert!(world.body(ball).position().y < -2.0);
}

struct ImpulseProbe(Rc<RefCell<f32>>);

impl ContactListener for ImpulseProbe {
    fn post_solve(&mut self, _contact: &mut Contact, impulse: &ContactImpulse) {
        let mut max = self.0.borrow_mut();
        for i in 0..impulse.count {
            *max = max.max(impulse.normal_impulses[i]);
        }
    }
}

#[test]
fn post_solve_reports_resting_weight() {
    let max_impulse = Rc::new(RefCell::new(0.0f32));
    let (mut world, ball) = drop_ball_world(ImpulseProbe(max_impulse.clone()));

    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
    }

    // At rest the per-step normal impulse carries the ball's weight:
    // m * g * dt, with m = pi * r^2.
    let mass = std::f32::consts::PI * 0.25;
    let resting = mass * 10.0 / 60.0;
    assert!(*max_impulse.borrow() >= resting * 0.5);
    assert!(world.body(ball).position().y > -0.1);
}

struct RejectingFilter;

impl ContactFilter for RejectingFilter {
    fn should_collide(&self, _a: &Fixture, _b: &Fixture) -> bool {
        false
    }
}

#[test]
fn custom_contact_filter_blocks_creation() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    world.set_contact_filter(RejectingFilter);

    let ground = world.create_body(BodyBuilder::new().position([0.0, -1.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(10.0, 1.0).into(),
    );
    let ball = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 2.0])
            .build(),
    );
    world.create_fixture(
        ball,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );

    for _ in 0..240 {
        world.step(1.0 / 60.0, 8, 3);
        assert_eq!(world.contact_count(), 0);
    }
    assert!(world.body(ball).position().y < -2.0);
}
