use rigid2d::prelude::*;
use rigid2d::tuning;

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

fn no_gravity_world() -> World {
    World::new(WorldDef::builder().gravity([0.0, 0.0]).build())
}

fn dynamic_ball(world: &mut World, pos: [f32; 2]) -> BodyId {
    let body = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position(pos)
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(
        body,
        &FixtureDef::builder().density(1.0).build(),
        shapes::circle([0.0, 0.0], 0.5).into(),
    );
    body
}

fn static_anchor(world: &mut World, pos: [f32; 2]) -> BodyId {
    let body = world.create_body(BodyBuilder::new().position(pos).build());
    world.create_fixture(
        body,
        &FixtureDef::builder().build(),
        shapes::box_polygon(0.25, 0.25).into(),
    );
    body
}

#[test]
fn distance_joint_holds_length() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let anchor = static_anchor(&mut world, [0.0, 5.0]);
    let ball = dynamic_ball(&mut world, [3.0, 5.0]);

    let def = DistanceJointDef::new(JointBase::new(anchor, ball)).world_anchors(
        world.bodies(),
        [0.0, 5.0],
        [3.0, 5.0],
    );
    world.create_distance_joint(&def);

    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
        let span = world
            .body(ball)
            .position()
            .distance(world.body(anchor).position());
        assert!(approx(span, 3.0, 0.05));
    }
}

#[test]
fn distance_joint_spring_oscillates_within_limits() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let anchor = static_anchor(&mut world, [0.0, 10.0]);
    let ball = dynamic_ball(&mut world, [0.0, 7.0]);

    let mass = std::f32::consts::PI * 0.25;
    let (stiffness, damping) = tuning::linear_stiffness(1.0, 0.2, 0.0, mass);
    let def = DistanceJointDef::new(JointBase::new(anchor, ball))
        .world_anchors(world.bodies(), [0.0, 10.0], [0.0, 7.0])
        .min_length(2.0)
        .max_length(5.0)
        .stiffness(stiffness)
        .damping(damping);
    world.create_distance_joint(&def);

    for _ in 0..600 {
        world.step(1.0 / 60.0, 8, 3);
        let span = world
            .body(ball)
            .position()
            .distance(world.body(anchor).position());
        assert!(span > 1.8 && span < 5.2);
    }
}

#[test]
fn revolute_joint_pins_and_motors() {
    let mut world = no_gravity_world();
    let anchor = static_anchor(&mut world, [0.0, 0.0]);

    // A bar pinned at one end.
    let bar = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([1.0, 0.0])
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(
        bar,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(1.0, 0.1).into(),
    );

    let def = RevoluteJointDef::new(JointBase::new(anchor, bar))
        .world_anchor(world.bodies(), [0.0, 0.0])
        .enable_motor(true)
        .motor_speed(2.0)
        .max_motor_torque(1000.0);
    let joint = world.create_revolute_joint(&def);

    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
        // The pivot stays put.
        let Joint::Revolute(revolute) = world.joint(joint) else {
            panic!("expected a revolute joint");
        };
        let pivot = revolute.anchor_b(world.bodies());
        assert!(approx(pivot.x, 0.0, 0.02));
        assert!(approx(pivot.y, 0.0, 0.02));
    }

    // The motor reached its speed.
    assert!(approx(world.body(bar).angular_velocity(), 2.0, 0.1));
}

#[test]
fn revolute_joint_limit_clamps_angle() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let anchor = static_anchor(&mut world, [0.0, 0.0]);

    let bar = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([1.0, 0.0])
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(
        bar,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(1.0, 0.1).into(),
    );

    let limit = 0.25;
    let def = RevoluteJointDef::new(JointBase::new(anchor, bar))
        .world_anchor(world.bodies(), [0.0, 0.0])
        .enable_limit(true)
        .limits(-limit, limit);
    world.create_revolute_joint(&def);

    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
        let angle = world.body(bar).angle();
        assert!(angle >= -limit - 0.05 && angle <= limit + 0.05);
    }
}

#[test]
fn prismatic_joint_constrains_to_axis() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let frame = static_anchor(&mut world, [0.0, 0.0]);
    let slider = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 0.0])
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(
        slider,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(0.5, 0.5).into(),
    );

    // Horizontal axis: gravity cannot move it vertically.
    let def = PrismaticJointDef::new(JointBase::new(frame, slider))
        .world_anchor_axis(world.bodies(), [0.0, 0.0], [1.0, 0.0])
        .enable_limit(true)
        .limits(-3.0, 3.0)
        .enable_motor(true)
        .motor_speed(1.0)
        .max_motor_force(100.0);
    world.create_prismatic_joint(&def);

    for _ in 0..240 {
        world.step(1.0 / 60.0, 8, 3);
        let pos = world.body(slider).position();
        assert!(approx(pos.y, 0.0, 0.01));
        assert!(approx(world.body(slider).angle(), 0.0, 0.01));
        assert!(pos.x <= 3.0 + 0.05);
    }
    // The motor drove it to the upper limit.
    assert!(approx(world.body(slider).position().x, 3.0, 0.1));
}

#[test]
fn rope_joint_caps_distance() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let anchor = static_anchor(&mut world, [0.0, 5.0]);
    let ball = dynamic_ball(&mut world, [0.0, 3.0]);

    let def = RopeJointDef::new(JointBase::new(anchor, ball))
        .local_anchor_a([0.0, 0.0])
        .local_anchor_b([0.0, 0.0])
        .max_length(4.0);
    world.create_rope_joint(&def);

    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
        let span = world
            .body(ball)
            .position()
            .distance(world.body(anchor).position());
        assert!(span <= 4.0 + 0.1);
    }
    // The rope ends taut under gravity.
    let span = world
        .body(ball)
        .position()
        .distance(world.body(anchor).position());
    assert!(approx(span, 4.0, 0.1));
}

#[test]
fn weld_joint_locks_relative_pose() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let ground = static_anchor(&mut world, [0.0, -2.0]);

    let a = dynamic_ball(&mut world, [0.0, 2.0]);
    let b = dynamic_ball(&mut world, [1.5, 2.0]);

    let def = WeldJointDef::new(JointBase::new(a, b)).world_anchor(world.bodies(), [0.75, 2.0]);
    world.create_weld_joint(&def);

    // Tie the pair to the world so it cannot drift far.
    let tie = DistanceJointDef::new(JointBase::new(ground, a)).world_anchors(
        world.bodies(),
        [0.0, -2.0],
        [0.0, 2.0],
    );
    world.create_distance_joint(&tie);

    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
        let span = world.body(a).position().distance(world.body(b).position());
        assert!(approx(span, 1.5, 0.05));
        let relative = world.body(b).angle() - world.body(a).angle();
        assert!(approx(relative, 0.0, 0.05));
    }
}

#[test]
fn soft_weld_keeps_anchors_pinned() {
    let mut world = no_gravity_world();
    let a = dynamic_ball(&mut world, [0.0, 0.0]);
    let b = dynamic_ball(&mut world, [1.5, 0.0]);

    let inertia_a = world.body(a).inertia();
    let inertia_b = world.body(b).inertia();
    let (stiffness, damping) = tuning::angular_stiffness(2.0, 0.7, inertia_a, inertia_b);
    let def = WeldJointDef::new(JointBase::new(a, b))
        .world_anchor(world.bodies(), [0.75, 0.0])
        .stiffness(stiffness)
        .damping(damping);
    world.create_weld_joint(&def);

    // Give the pair a relative spin; the torsional spring damps it out
    // while the linear part stays pinned.
    world.body_mut(b).set_angular_velocity(3.0);

    for _ in 0..600 {
        world.step(1.0 / 60.0, 8, 3);
        let span = world.body(a).position().distance(world.body(b).position());
        assert!(approx(span, 1.5, 0.1));
    }
    let relative = world.body(b).angular_velocity() - world.body(a).angular_velocity();
    assert!(relative.abs() < 0.2);
}

#[test]
fn pulley_joint_trades_lengths() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());

    let left = dynamic_ball(&mut world, [-2.0, 0.0]);
    let right = dynamic_ball(&mut world, [2.0, 0.0]);
    // Make the left side heavier so it sinks.
    world.create_fixture(
        left,
        &FixtureDef::builder().density(5.0).build(),
        shapes::circle([0.0, 0.0], 0.4).into(),
    );
    world.reset_mass_data(left);

    let def = PulleyJointDef::new(JointBase::new(left, right))
        .world_anchors(
            world.bodies(),
            [-2.0, 4.0],
            [2.0, 4.0],
            [-2.0, 0.0],
            [2.0, 0.0],
            1.0,
        )
        .unwrap();
    world.create_pulley_joint(&def).unwrap();

    let initial_total = 8.0; // 4 + 4
    for _ in 0..240 {
        world.step(1.0 / 60.0, 8, 3);
    }

    // Left went down, right came up, total rope length is conserved.
    assert!(world.body(left).position().y < -0.5);
    assert!(world.body(right).position().y > 0.5);
    let length_a = (world.body(left).position() - Vec2::new(-2.0, 4.0)).length();
    let length_b = (world.body(right).position() - Vec2::new(2.0, 4.0)).length();
    assert!(approx(length_a + length_b, initial_total, 0.2));
}

#[test]
fn gear_joint_couples_revolutes() {
    let mut world = no_gravity_world();
    let ground = static_anchor(&mut world, [0.0, -3.0]);

    let make_wheel = |world: &mut World, x: f32| {
        let wheel = world.create_body(
            BodyBuilder::new()
                .body_type(BodyType::Dynamic)
                .position([x, 0.0])
                .allow_sleep(false)
                .build(),
        );
        world.create_fixture(
            wheel,
            &FixtureDef::builder().density(1.0).build(),
            shapes::circle([0.0, 0.0], 0.5).into(),
        );
        wheel
    };
    let wheel_a = make_wheel(&mut world, -1.0);
    let wheel_b = make_wheel(&mut world, 1.0);

    let rev_a = world.create_revolute_joint(
        &RevoluteJointDef::new(JointBase::new(ground, wheel_a))
            .world_anchor(world.bodies(), [-1.0, 0.0]),
    );
    let rev_b = world.create_revolute_joint(
        &RevoluteJointDef::new(JointBase::new(ground, wheel_b))
            .world_anchor(world.bodies(), [1.0, 0.0]),
    );

    let ratio = 2.0;
    world
        .create_gear_joint(&GearJointDef::new(
            JointBase::new(wheel_a, wheel_b),
            rev_a,
            rev_b,
            ratio,
        ))
        .unwrap();

    // Spin wheel A; the gear forces angle_a + ratio * angle_b = const.
    world.body_mut(wheel_a).set_angular_velocity(4.0);

    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
        let sum = world.body(wheel_a).angle() + ratio * world.body(wheel_b).angle();
        assert!(approx(sum, 0.0, 0.05));
    }
    assert!(world.body(wheel_b).angle() < -0.5);
}

#[test]
fn gear_joint_rejects_bad_references() {
    let mut world = no_gravity_world();
    let ground = static_anchor(&mut world, [0.0, -3.0]);
    let a = dynamic_ball(&mut world, [-1.0, 0.0]);
    let b = dynamic_ball(&mut world, [1.0, 0.0]);

    let rev = world.create_revolute_joint(
        &RevoluteJointDef::new(JointBase::new(ground, a)).world_anchor(world.bodies(), [-1.0, 0.0]),
    );
    let rope = world.create_rope_joint(&RopeJointDef::new(JointBase::new(ground, b)).max_length(3.0));

    assert!(world
        .create_gear_joint(&GearJointDef::new(JointBase::new(a, b), rev, rope, 1.0))
        .is_err());
    assert!(world
        .create_gear_joint(&GearJointDef::new(JointBase::new(a, b), rev, rev, 0.0))
        .is_err());
}

#[test]
fn wheel_joint_suspension_settles() {
    let mut world = World::new(WorldDef::builder().gravity([0.0, -10.0]).build());
    let ground = world.create_body(BodyBuilder::new().position([0.0, -1.0]).build());
    world.create_fixture(
        ground,
        &FixtureDef::builder().build(),
        shapes::box_polygon(20.0, 1.0).into(),
    );

    let chassis = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 2.0])
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(
        chassis,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(1.0, 0.25).into(),
    );

    let wheel = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 1.0])
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(
        wheel,
        &FixtureDef::builder().density(1.0).friction(0.9).build(),
        shapes::circle([0.0, 0.0], 0.4).into(),
    );

    let mass = world.body(chassis).mass();
    let (stiffness, damping) = tuning::linear_stiffness(4.0, 0.7, mass, world.body(wheel).mass());
    let def = WheelJointDef::new(JointBase::new(chassis, wheel))
        .world_anchor_axis(world.bodies(), [0.0, 1.0], [0.0, 1.0])
        .stiffness(stiffness)
        .damping(damping);
    world.create_wheel_joint(&def);

    for _ in 0..600 {
        world.step(1.0 / 60.0, 8, 3);
        // The wheel stays under the chassis on the suspension axis.
        let dx = world.body(wheel).position().x - world.body(chassis).position().x;
        assert!(dx.abs() < 0.1);
    }
    // Settled: wheel resting on the ground, chassis riding the spring.
    assert!(approx(world.body(wheel).position().y, 0.4, 0.1));
    assert!(world.body(chassis).position().y > world.body(wheel).position().y);
}

#[test]
fn mouse_joint_tracks_target() {
    let mut world = no_gravity_world();
    let ground = static_anchor(&mut world, [0.0, -5.0]);
    let ball = dynamic_ball(&mut world, [0.0, 0.0]);

    let mass = world.body(ball).mass();
    let (stiffness, damping) = tuning::linear_stiffness(5.0, 0.7, 0.0, mass);
    let def = MouseJointDef::new(JointBase::new(ground, ball))
        .target([0.0, 0.0])
        .max_force(1000.0 * mass)
        .stiffness(stiffness)
        .damping(damping);
    let joint = world.create_mouse_joint(&def);
    world.set_mouse_target(joint, [3.0, 2.0]);

    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
    }
    let pos = world.body(ball).position();
    assert!(approx(pos.x, 3.0, 0.1));
    assert!(approx(pos.y, 2.0, 0.1));
}

#[test]
fn friction_joint_stops_sliding() {
    let mut world = no_gravity_world();
    let ground = static_anchor(&mut world, [0.0, -5.0]);
    let puck = world.create_body(
        BodyBuilder::new()
            .body_type(BodyType::Dynamic)
            .position([0.0, 0.0])
            .linear_velocity([5.0, 0.0])
            .angular_velocity(3.0)
            .allow_sleep(false)
            .build(),
    );
    world.create_fixture(
        puck,
        &FixtureDef::builder().density(1.0).build(),
        shapes::box_polygon(0.5, 0.5).into(),
    );

    let def = FrictionJointDef::new(JointBase::new(ground, puck))
        .world_anchor(world.bodies(), [0.0, 0.0])
        .max_force(10.0)
        .max_torque(10.0);
    world.create_friction_joint(&def);

    for _ in 0..600 {
        world.step(1.0 / 60.0, 8, 3);
    }
    assert!(world.body(puck).linear_velocity().length() < 0.05);
    assert!(world.body(puck).angular_velocity().abs() < 0.05);
}

#[test]
fn motor_joint_drives_to_offset() {
    let mut world = no_gravity_world();
    let frame = static_anchor(&mut world, [0.0, 0.0]);
    let follower = dynamic_ball(&mut world, [0.0, 0.0]);

    let def = MotorJointDef::new(JointBase::new(frame, follower))
        .linear_offset([2.0, 1.0])
        .angular_offset(0.5)
        .max_force(500.0)
        .max_torque(500.0)
        .correction_factor(0.3);
    world.create_motor_joint(&def);

    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
    }
    let pos = world.body(follower).position();
    assert!(approx(pos.x, 2.0, 0.1));
    assert!(approx(pos.y, 1.0, 0.1));
    assert!(approx(world.body(follower).angle(), 0.5, 0.1));
}

#[test]
fn angle_joint_matches_relative_angle() {
    let mut world = no_gravity_world();
    let a = dynamic_ball(&mut world, [-1.0, 0.0]);
    let b = dynamic_ball(&mut world, [1.0, 0.0]);

    let def = AngleJointDef::new(JointBase::new(a, b)).target_angle(0.8);
    world.create_angle_joint(&def);

    for _ in 0..300 {
        world.step(1.0 / 60.0, 8, 3);
    }
    let relative = world.body(b).angle() - world.body(a).angle();
    assert!(approx(relative, 0.8, 0.05));
}

#[test]
fn joint_destruction_restores_collision() {
    let mut world = no_gravity_world();
    let a = dynamic_ball(&mut world, [-0.4, 0.0]);
    let b = dynamic_ball(&mut world, [0.4, 0.0]);

    // Overlapping bodies joined without collide_connected: no contact
    // response between them.
    let joint =
        world.create_distance_joint(&DistanceJointDef::new(JointBase::new(a, b)).length(0.8));

    for _ in 0..30 {
        world.step(1.0 / 60.0, 8, 3);
    }
    // Still overlapping; the joint holds them together and no contact pushes
    // them apart.
    let span = world.body(a).position().distance(world.body(b).position());
    assert!(span < 0.95);

    world.destroy_joint(joint);
    for _ in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
    }
    // The restored contact pushed them out of overlap.
    let span = world.body(a).position().distance(world.body(b).position());
    assert!(span >= 1.0 - 3.0 * tuning::LINEAR_SLOP);
}
