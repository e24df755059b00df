//! The physics world: owns every body, fixture, joint, and contact, and
//! drives the simulation pipeline each step.
//!
//! Control flow per step: broad-phase pairs -> narrow-phase manifolds ->
//! discrete island solve -> continuous (TOI) solve -> user callbacks.

use bitflags::bitflags;
use slab::Slab;

use crate::body::{Body, BodyDef, BodyFlags, BodyType};
use crate::collision::{time_of_impact, DistanceProxy, ToiInput, ToiState};
use crate::contact::ContactFlags;
use crate::contact_manager::ContactManager;
use crate::core::math::Transform;
use crate::events::{ContactFilter, ContactListener};
use crate::fixture::{Fixture, FixtureDef};
use crate::island::Island;
use crate::joints::{
    AngleJointDef, DistanceJointDef, FrictionJointDef, GearJoint, GearJointDef, Joint, JointError,
    MotorJointDef, MouseJoint, MouseJointDef, PrismaticJointDef, PulleyJointDef, RevoluteJointDef,
    RopeJointDef, WeldJointDef, WheelJointDef,
};
use crate::query::{Aabb, QueryFilter, RayCastInput, RayResult};
use crate::shapes::{MassData, Shape};
use crate::time_step::TimeStep;
use crate::tuning;
use crate::types::{BodyId, ContactId, FixtureId, JointId, Vec2};

bitflags! {
    #[derive(Copy, Clone, Debug)]
    struct WorldFlags: u32 {
        const NEW_CONTACTS = 0x0001;
        const LOCKED = 0x0002;
        const CLEAR_FORCES = 0x0004;
    }
}

/// World definition with builder API.
#[derive(Clone, Debug)]
pub struct WorldDef {
    pub gravity: Vec2,
    pub allow_sleep: bool,
    pub warm_starting: bool,
    pub continuous_physics: bool,
    pub sub_stepping: bool,
}

impl Default for WorldDef {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            allow_sleep: true,
            warm_starting: true,
            continuous_physics: true,
            sub_stepping: false,
        }
    }
}

impl WorldDef {
    pub fn builder() -> WorldBuilder {
        WorldBuilder {
            def: Self::default(),
        }
    }
}

/// Fluent builder for `WorldDef`.
#[derive(Clone, Debug, Default)]
pub struct WorldBuilder {
    def: WorldDef,
}

impl WorldBuilder {
    /// Gravity vector in m/s^2.
    pub fn gravity<V: Into<Vec2>>(mut self, g: V) -> Self {
        self.def.gravity = g.into();
        self
    }
    /// Allow bodies to sleep when they come to rest.
    pub fn allow_sleep(mut self, flag: bool) -> Self {
        self.def.allow_sleep = flag;
        self
    }
    /// Warm start the solvers from last step's impulses.
    pub fn warm_starting(mut self, flag: bool) -> Self {
        self.def.warm_starting = flag;
        self
    }
    /// Enable continuous collision for bullets and fast bodies.
    pub fn continuous_physics(mut self, flag: bool) -> Self {
        self.def.continuous_physics = flag;
        self
    }
    /// Stop after the first TOI event of each step (debugging aid).
    pub fn sub_stepping(mut self, flag: bool) -> Self {
        self.def.sub_stepping = flag;
        self
    }

    #[must_use]
    pub fn build(self) -> WorldDef {
        self.def
    }
}

/// The simulation world.
pub struct World {
    bodies: Slab<Body>,
    fixtures: Slab<Fixture>,
    joints: Slab<Joint>,
    contact_manager: ContactManager,
    gravity: Vec2,
    flags: WorldFlags,
    allow_sleep: bool,
    warm_starting: bool,
    continuous_physics: bool,
    sub_stepping: bool,
    step_complete: bool,
    inv_dt0: f32,
    island: Island,
}

impl World {
    pub fn new(def: WorldDef) -> World {
        World {
            bodies: Slab::new(),
            fixtures: Slab::new(),
            joints: Slab::new(),
            contact_manager: ContactManager::new(),
            gravity: def.gravity,
            flags: WorldFlags::CLEAR_FORCES,
            allow_sleep: def.allow_sleep,
            warm_starting: def.warm_starting,
            continuous_physics: def.continuous_physics,
            sub_stepping: def.sub_stepping,
            step_complete: true,
            inv_dt0: 0.0,
            island: Island::new(32, 64, 16),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.flags.contains(WorldFlags::LOCKED)
    }

    fn assert_unlocked(&self) {
        assert!(!self.is_locked(), "world is locked during a step");
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_gravity<V: Into<Vec2>>(&mut self, g: V) {
        self.gravity = g.into();
    }

    pub fn is_sleeping_allowed(&self) -> bool {
        self.allow_sleep
    }

    pub fn allow_sleeping(&mut self, flag: bool) {
        if flag == self.allow_sleep {
            return;
        }
        self.allow_sleep = flag;
        if !flag {
            let ids: Vec<usize> = self.bodies.iter().map(|(k, _)| k).collect();
            for id in ids {
                self.bodies[id].set_awake(true);
            }
        }
    }

    pub fn is_warm_starting_enabled(&self) -> bool {
        self.warm_starting
    }

    pub fn enable_warm_starting(&mut self, flag: bool) {
        self.warm_starting = flag;
    }

    pub fn is_continuous_enabled(&self) -> bool {
        self.continuous_physics
    }

    pub fn enable_continuous(&mut self, flag: bool) {
        self.continuous_physics = flag;
    }

    pub fn is_sub_stepping_enabled(&self) -> bool {
        self.sub_stepping
    }

    pub fn enable_sub_stepping(&mut self, flag: bool) {
        self.sub_stepping = flag;
    }

    pub fn set_auto_clear_forces(&mut self, flag: bool) {
        self.flags.set(WorldFlags::CLEAR_FORCES, flag);
    }

    pub fn auto_clear_forces(&self) -> bool {
        self.flags.contains(WorldFlags::CLEAR_FORCES)
    }

    pub fn set_contact_listener<L: ContactListener + 'static>(&mut self, listener: L) {
        self.contact_manager.listener = Some(Box::new(listener));
    }

    pub fn clear_contact_listener(&mut self) {
        self.contact_manager.listener = None;
    }

    pub fn set_contact_filter<F: ContactFilter + 'static>(&mut self, filter: F) {
        self.contact_manager.contact_filter = Box::new(filter);
    }

    // -------------------------------------------------------------------
    // Bodies

    pub fn create_body(&mut self, def: BodyDef) -> BodyId {
        self.assert_unlocked();
        BodyId(self.bodies.insert(Body::new(&def)))
    }

    /// Destroy a body and everything attached to it: joints first, then
    /// contacts, then fixtures with their proxies.
    pub fn destroy_body(&mut self, id: BodyId) {
        self.assert_unlocked();

        let joint_ids: Vec<JointId> = self.bodies[id.0].joint_edges.iter().map(|e| e.joint).collect();
        for joint in joint_ids {
            self.destroy_joint(joint);
        }

        let contact_ids: Vec<ContactId> =
            self.bodies[id.0].contact_edges.iter().map(|e| e.contact).collect();
        for contact in contact_ids {
            self.contact_manager
                .destroy(contact, &mut self.bodies, &self.fixtures);
        }

        let fixture_ids: Vec<FixtureId> = self.bodies[id.0].fixtures.clone();
        for fixture in fixture_ids {
            self.fixtures[fixture.0].destroy_proxies(&mut self.contact_manager.broad_phase);
            self.fixtures.remove(fixture.0);
        }

        self.bodies.remove(id.0);
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0]
    }

    pub fn body_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id.0]
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.iter().map(|(k, _)| BodyId(k))
    }

    pub fn awake_body_count(&self) -> usize {
        self.bodies
            .iter()
            .filter(|(_, b)| b.is_awake() && b.body_type() != BodyType::Static)
            .count()
    }

    /// Teleport a body. The broad-phase is updated immediately so queries
    /// see the new pose before the next step.
    pub fn set_body_transform<V: Into<Vec2>>(&mut self, id: BodyId, position: V, angle: f32) {
        self.assert_unlocked();

        let body = &mut self.bodies[id.0];
        body.xf = Transform::from_pos_angle(position, angle);
        body.sweep.c = body.xf.transform_point(body.sweep.local_center);
        body.sweep.a = angle;
        body.sweep.c0 = body.sweep.c;
        body.sweep.a0 = angle;

        let xf = body.xf;
        let fixture_ids = body.fixtures.clone();
        for fixture in fixture_ids {
            self.fixtures[fixture.0].synchronize(&mut self.contact_manager.broad_phase, &xf, &xf);
        }
        // New overlaps must be found even if the body is asleep.
        self.flags.insert(WorldFlags::NEW_CONTACTS);
    }

    /// Change a body's type. Existing contacts are destroyed so the pair
    /// rules re-apply, and the mass data is rebuilt.
    pub fn set_body_type(&mut self, id: BodyId, body_type: BodyType) {
        self.assert_unlocked();
        if self.bodies[id.0].body_type == body_type {
            return;
        }

        self.bodies[id.0].body_type = body_type;
        self.reset_mass_data(id);

        if body_type == BodyType::Static {
            let body = &mut self.bodies[id.0];
            body.linear_velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
            body.sweep.c0 = body.sweep.c;
            body.sweep.a0 = body.sweep.a;
            body.flags.remove(BodyFlags::AWAKE);
        } else {
            self.bodies[id.0].set_awake(true);
        }

        self.bodies[id.0].force = Vec2::ZERO;
        self.bodies[id.0].torque = 0.0;

        let contact_ids: Vec<ContactId> =
            self.bodies[id.0].contact_edges.iter().map(|e| e.contact).collect();
        for contact in contact_ids {
            self.contact_manager
                .destroy(contact, &mut self.bodies, &self.fixtures);
        }

        let fixture_ids = self.bodies[id.0].fixtures.clone();
        for fixture in fixture_ids {
            self.fixtures[fixture.0].touch_proxies(&mut self.contact_manager.broad_phase);
        }
        self.flags.insert(WorldFlags::NEW_CONTACTS);
    }

    /// Enable or disable a body. Disabled bodies keep their fixtures but
    /// have no proxies, contacts, or simulation.
    pub fn set_body_enabled(&mut self, id: BodyId, flag: bool) {
        self.assert_unlocked();
        if flag == self.bodies[id.0].is_enabled() {
            return;
        }

        if flag {
            self.bodies[id.0].flags.insert(BodyFlags::ENABLED);
            let xf = self.bodies[id.0].xf;
            let fixture_ids = self.bodies[id.0].fixtures.clone();
            for fixture in fixture_ids {
                self.fixtures[fixture.0].create_proxies(
                    fixture,
                    &mut self.contact_manager.broad_phase,
                    &xf,
                );
            }
            self.flags.insert(WorldFlags::NEW_CONTACTS);
        } else {
            self.bodies[id.0].flags.remove(BodyFlags::ENABLED);
            let fixture_ids = self.bodies[id.0].fixtures.clone();
            for fixture in fixture_ids {
                self.fixtures[fixture.0].destroy_proxies(&mut self.contact_manager.broad_phase);
            }
            let contact_ids: Vec<ContactId> =
                self.bodies[id.0].contact_edges.iter().map(|e| e.contact).collect();
            for contact in contact_ids {
                self.contact_manager
                    .destroy(contact, &mut self.bodies, &self.fixtures);
            }
        }
    }

    // -------------------------------------------------------------------
    // Fixtures

    /// Attach a shape to a body. Mass data is rebuilt from the densities.
    pub fn create_fixture(&mut self, body: BodyId, def: &FixtureDef, shape: Shape) -> FixtureId {
        self.assert_unlocked();

        let id = FixtureId(self.fixtures.insert(Fixture::new(body, def, shape)));
        if self.bodies[body.0].is_enabled() {
            let xf = self.bodies[body.0].xf;
            self.fixtures[id.0].create_proxies(id, &mut self.contact_manager.broad_phase, &xf);
        }
        self.bodies[body.0].fixtures.push(id);

        if def.density > 0.0 {
            self.reset_mass_data(body);
        }

        // New fixtures need a broad-phase pass before the next collide.
        self.flags.insert(WorldFlags::NEW_CONTACTS);
        id
    }

    /// Remove a fixture, its contacts, and its proxies.
    pub fn destroy_fixture(&mut self, id: FixtureId) {
        self.assert_unlocked();

        let body = self.fixtures[id.0].body();

        let contact_ids: Vec<ContactId> = self.bodies[body.0]
            .contact_edges
            .iter()
            .map(|e| e.contact)
            .filter(|c| {
                let contact = &self.contact_manager.contacts[c.0];
                contact.fixture_a() == id || contact.fixture_b() == id
            })
            .collect();
        for contact in contact_ids {
            self.contact_manager
                .destroy(contact, &mut self.bodies, &self.fixtures);
        }

        self.fixtures[id.0].destroy_proxies(&mut self.contact_manager.broad_phase);
        if let Some(pos) = self.bodies[body.0].fixtures.iter().position(|&f| f == id) {
            self.bodies[body.0].fixtures.swap_remove(pos);
        }
        self.fixtures.remove(id.0);

        self.reset_mass_data(body);
    }

    pub fn fixture(&self, id: FixtureId) -> &Fixture {
        &self.fixtures[id.0]
    }

    pub fn fixture_mut(&mut self, id: FixtureId) -> &mut Fixture {
        &mut self.fixtures[id.0]
    }

    /// Change a fixture's collision filter and re-evaluate its contacts.
    pub fn set_fixture_filter(&mut self, id: FixtureId, filter: crate::filter::Filter) {
        self.fixtures[id.0].filter = filter;
        self.refilter_fixture(id);
    }

    /// Flag every contact of the fixture for filtering and re-run the
    /// broad-phase pairs for its proxies.
    pub fn refilter_fixture(&mut self, id: FixtureId) {
        let body = self.fixtures[id.0].body();
        let contact_ids: Vec<ContactId> = self.bodies[body.0]
            .contact_edges
            .iter()
            .map(|e| e.contact)
            .collect();
        for contact_id in contact_ids {
            let contact = &mut self.contact_manager.contacts[contact_id.0];
            if contact.fixture_a() == id || contact.fixture_b() == id {
                contact.flag_for_filtering();
            }
        }
        self.fixtures[id.0].touch_proxies(&mut self.contact_manager.broad_phase);
        self.flags.insert(WorldFlags::NEW_CONTACTS);
    }

    /// Toggle sensor behavior; existing contacts are re-evaluated on the
    /// next step.
    pub fn set_fixture_sensor(&mut self, id: FixtureId, sensor: bool) {
        if self.fixtures[id.0].is_sensor != sensor {
            let body = self.fixtures[id.0].body();
            self.bodies[body.0].set_awake(true);
            self.fixtures[id.0].is_sensor = sensor;
        }
    }

    /// Rebuild a body's mass, center, and inertia from its fixtures.
    pub fn reset_mass_data(&mut self, id: BodyId) {
        let fixture_ids = self.bodies[id.0].fixtures.clone();
        let body = &mut self.bodies[id.0];

        body.mass = 0.0;
        body.inv_mass = 0.0;
        body.inertia = 0.0;
        body.inv_inertia = 0.0;
        body.sweep.local_center = Vec2::ZERO;

        // Static and kinematic bodies have zero mass.
        if body.body_type != BodyType::Dynamic {
            body.sweep.c0 = body.xf.p;
            body.sweep.c = body.xf.p;
            body.sweep.a0 = body.sweep.a;
            return;
        }

        let mut local_center = Vec2::ZERO;
        for fixture_id in &fixture_ids {
            let fixture = &self.fixtures[fixture_id.0];
            if fixture.density() == 0.0 {
                continue;
            }
            let mass_data = fixture.compute_mass();
            body.mass += mass_data.mass;
            local_center += mass_data.center * mass_data.mass;
            body.inertia += mass_data.inertia;
        }

        if body.mass > 0.0 {
            body.inv_mass = 1.0 / body.mass;
            local_center *= body.inv_mass;
        } else {
            // Dynamic bodies need mass; default to one kilogram.
            body.mass = 1.0;
            body.inv_mass = 1.0;
        }

        if body.inertia > 0.0 && !body.flags.contains(BodyFlags::FIXED_ROTATION) {
            // Center the inertia about the center of mass.
            body.inertia -= body.mass * local_center.dot(local_center);
            debug_assert!(body.inertia > 0.0);
            body.inv_inertia = 1.0 / body.inertia;
        } else {
            body.inertia = 0.0;
            body.inv_inertia = 0.0;
        }

        let old_center = body.sweep.c;
        body.sweep.local_center = local_center;
        body.sweep.c = body.xf.transform_point(local_center);
        body.sweep.c0 = body.sweep.c;

        // Update velocity for the center-of-mass shift.
        body.linear_velocity +=
            crate::types::cross_scalar_vec(body.angular_velocity, body.sweep.c - old_center);
    }

    /// Override a body's mass properties until the next reset.
    pub fn set_mass_data(&mut self, id: BodyId, mass_data: &MassData) {
        self.assert_unlocked();
        let body = &mut self.bodies[id.0];
        if body.body_type != BodyType::Dynamic {
            return;
        }

        body.inv_mass = 0.0;
        body.inertia = 0.0;
        body.inv_inertia = 0.0;

        body.mass = if mass_data.mass > 0.0 { mass_data.mass } else { 1.0 };
        body.inv_mass = 1.0 / body.mass;

        if mass_data.inertia > 0.0 && !body.flags.contains(BodyFlags::FIXED_ROTATION) {
            body.inertia =
                mass_data.inertia - body.mass * mass_data.center.dot(mass_data.center);
            debug_assert!(body.inertia > 0.0);
            body.inv_inertia = 1.0 / body.inertia;
        }

        let old_center = body.sweep.c;
        body.sweep.local_center = mass_data.center;
        body.sweep.c = body.xf.transform_point(mass_data.center);
        body.sweep.c0 = body.sweep.c;
        body.linear_velocity +=
            crate::types::cross_scalar_vec(body.angular_velocity, body.sweep.c - old_center);
    }

    // -------------------------------------------------------------------
    // Joints

    fn finish_joint(&mut self, joint: Joint) -> JointId {
        let body_a = joint.body_a();
        let body_b = joint.body_b();
        let collide_connected = joint.collide_connected();

        let id = JointId(self.joints.insert(joint));
        self.bodies[body_a.0].joint_edges.push(crate::body::JointEdge {
            other: body_b,
            joint: id,
        });
        self.bodies[body_b.0].joint_edges.push(crate::body::JointEdge {
            other: body_a,
            joint: id,
        });

        // Connected bodies may have live contacts that the joint now vetoes.
        if !collide_connected {
            self.flag_contacts_between(body_a, body_b);
        }
        id
    }

    fn flag_contacts_between(&mut self, body_a: BodyId, body_b: BodyId) {
        let contact_ids: Vec<ContactId> = self.bodies[body_b.0]
            .contact_edges
            .iter()
            .filter(|e| e.other == body_a)
            .map(|e| e.contact)
            .collect();
        for contact in contact_ids {
            self.contact_manager.contacts[contact.0].flag_for_filtering();
        }
    }

    pub fn create_distance_joint(&mut self, def: &DistanceJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Distance(crate::joints::DistanceJoint::new(def)))
    }

    pub fn create_revolute_joint(&mut self, def: &RevoluteJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Revolute(crate::joints::RevoluteJoint::new(def)))
    }

    pub fn create_prismatic_joint(&mut self, def: &PrismaticJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Prismatic(crate::joints::PrismaticJoint::new(def)))
    }

    pub fn create_pulley_joint(&mut self, def: &PulleyJointDef) -> Result<JointId, JointError> {
        self.assert_unlocked();
        if def.ratio == 0.0 {
            return Err(JointError::ZeroRatio);
        }
        Ok(self.finish_joint(Joint::Pulley(crate::joints::PulleyJoint::new(def))))
    }

    pub fn create_gear_joint(&mut self, def: &GearJointDef) -> Result<JointId, JointError> {
        self.assert_unlocked();
        let gear = GearJoint::new(def, &self.joints, &self.bodies)?;
        Ok(self.finish_joint(Joint::Gear(gear)))
    }

    pub fn create_wheel_joint(&mut self, def: &WheelJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Wheel(crate::joints::WheelJoint::new(def)))
    }

    pub fn create_weld_joint(&mut self, def: &WeldJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Weld(crate::joints::WeldJoint::new(def)))
    }

    pub fn create_friction_joint(&mut self, def: &FrictionJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Friction(crate::joints::FrictionJoint::new(def)))
    }

    pub fn create_motor_joint(&mut self, def: &MotorJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Motor(crate::joints::MotorJoint::new(def)))
    }

    pub fn create_mouse_joint(&mut self, def: &MouseJointDef) -> JointId {
        self.assert_unlocked();
        let joint = MouseJoint::new(def, &self.bodies);
        self.finish_joint(Joint::Mouse(joint))
    }

    pub fn create_rope_joint(&mut self, def: &RopeJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Rope(crate::joints::RopeJoint::new(def)))
    }

    pub fn create_angle_joint(&mut self, def: &AngleJointDef) -> JointId {
        self.assert_unlocked();
        self.finish_joint(Joint::Angle(crate::joints::AngleJoint::new(def)))
    }

    pub fn destroy_joint(&mut self, id: JointId) {
        self.assert_unlocked();

        let (body_a, body_b, collide_connected) = {
            let joint = &self.joints[id.0];
            (joint.body_a(), joint.body_b(), joint.collide_connected())
        };

        self.bodies[body_a.0].set_awake(true);
        self.bodies[body_b.0].set_awake(true);
        self.bodies[body_a.0].remove_joint_edge(id);
        self.bodies[body_b.0].remove_joint_edge(id);
        self.joints.remove(id.0);

        // Contacts between the bodies become valid again; touching the
        // proxies lets the broad phase recreate pairs that were vetoed.
        if !collide_connected {
            self.flag_contacts_between(body_a, body_b);
            let fixture_ids = self.bodies[body_a.0].fixtures.clone();
            for fixture in fixture_ids {
                self.fixtures[fixture.0].touch_proxies(&mut self.contact_manager.broad_phase);
            }
            self.flags.insert(WorldFlags::NEW_CONTACTS);
        }
    }

    /// Retarget a mouse joint and wake its body.
    pub fn set_mouse_target<V: Into<Vec2>>(&mut self, id: JointId, target: V) {
        if let Joint::Mouse(mouse) = &mut self.joints[id.0] {
            let body_b = mouse.base.body_b;
            mouse.set_target(target);
            self.bodies[body_b.0].set_awake(true);
        }
    }

    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.0]
    }

    pub fn joint_mut(&mut self, id: JointId) -> &mut Joint {
        &mut self.joints[id.0]
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint_ids(&self) -> impl Iterator<Item = JointId> + '_ {
        self.joints.iter().map(|(k, _)| JointId(k))
    }

    /// Bodies arena, for joint accessors that need world context.
    pub fn bodies(&self) -> &Slab<Body> {
        &self.bodies
    }

    // -------------------------------------------------------------------
    // Contacts

    pub fn contact(&self, id: ContactId) -> &crate::contact::Contact {
        &self.contact_manager.contacts[id.0]
    }

    pub fn contact_count(&self) -> usize {
        self.contact_manager.contact_count()
    }

    pub fn contact_ids(&self) -> Vec<ContactId> {
        self.contact_manager.contact_ids()
    }

    /// World-space manifold of a contact.
    pub fn contact_world_manifold(&self, id: ContactId) -> crate::collision::WorldManifold {
        let contact = &self.contact_manager.contacts[id.0];
        let fixture_a = &self.fixtures[contact.fixture_a().0];
        let fixture_b = &self.fixtures[contact.fixture_b().0];
        let xf_a = self.bodies[fixture_a.body().0].transform();
        let xf_b = self.bodies[fixture_b.body().0].transform();
        contact.world_manifold(
            xf_a,
            fixture_a.shape().radius(),
            xf_b,
            fixture_b.shape().radius(),
        )
    }

    // -------------------------------------------------------------------
    // Stepping

    /// Advance the simulation by `dt` seconds. Must not be called from a
    /// callback; the world is locked for the duration.
    pub fn step(&mut self, dt: f32, velocity_iterations: usize, position_iterations: usize) {
        self.assert_unlocked();

        // Deferred broad-phase pass for fixtures created since the last step.
        if self.flags.contains(WorldFlags::NEW_CONTACTS) {
            self.contact_manager
                .find_new_contacts(&mut self.bodies, &self.fixtures, &self.joints);
            self.flags.remove(WorldFlags::NEW_CONTACTS);
        }

        self.flags.insert(WorldFlags::LOCKED);

        let step = TimeStep {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio: self.inv_dt0 * dt,
            velocity_iterations,
            position_iterations,
            warm_starting: self.warm_starting,
        };

        // Narrow phase.
        self.contact_manager
            .collide(&mut self.bodies, &self.fixtures, &self.joints);

        // Discrete solve.
        if self.step_complete && step.dt > 0.0 {
            self.solve(&step);
        }

        // Continuous solve.
        if self.continuous_physics && step.dt > 0.0 {
            self.solve_toi(&step);
        }

        if step.dt > 0.0 {
            self.inv_dt0 = step.inv_dt;
        }

        if self.flags.contains(WorldFlags::CLEAR_FORCES) {
            self.clear_forces();
        }

        self.flags.remove(WorldFlags::LOCKED);
    }

    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }
    }

    /// Shift the world origin, for example to re-center a scrolling world.
    pub fn shift_origin<V: Into<Vec2>>(&mut self, new_origin: V) {
        self.assert_unlocked();
        let new_origin = new_origin.into();
        for (_, body) in self.bodies.iter_mut() {
            body.xf.p -= new_origin;
            body.sweep.c0 -= new_origin;
            body.sweep.c -= new_origin;
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.shift_origin(new_origin);
        }
        self.contact_manager.shift_origin(new_origin);
    }

    fn solve(&mut self, step: &TimeStep) {
        // Clear island flags.
        for (_, body) in self.bodies.iter_mut() {
            body.flags.remove(BodyFlags::ISLAND);
        }
        for (_, contact) in self.contact_manager.contacts.iter_mut() {
            contact.flags.remove(ContactFlags::ISLAND);
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.set_island_flag(false);
        }

        // DFS from every awake, enabled, non-static seed.
        let seeds: Vec<BodyId> = self.bodies.iter().map(|(k, _)| BodyId(k)).collect();
        let mut stack: Vec<BodyId> = Vec::with_capacity(self.bodies.len());

        for seed in seeds {
            {
                let body = &self.bodies[seed.0];
                if body.flags.contains(BodyFlags::ISLAND)
                    || !body.is_awake()
                    || !body.is_enabled()
                    || body.body_type() == BodyType::Static
                {
                    continue;
                }
            }

            self.island.clear();
            stack.clear();
            stack.push(seed);
            self.bodies[seed.0].flags.insert(BodyFlags::ISLAND);

            while let Some(body_id) = stack.pop() {
                debug_assert!(self.bodies[body_id.0].is_enabled());
                self.island.add_body(body_id, &mut self.bodies);

                // Everything touching an island is kept awake with it.
                self.bodies[body_id.0].set_awake(true);

                // A static body terminates the walk.
                if self.bodies[body_id.0].body_type() == BodyType::Static {
                    continue;
                }

                let contact_edges = self.bodies[body_id.0].contact_edges.clone();
                for edge in contact_edges {
                    let contact = &mut self.contact_manager.contacts[edge.contact.0];
                    if contact.flags.contains(ContactFlags::ISLAND) {
                        continue;
                    }
                    if !contact.is_enabled() || !contact.is_touching() {
                        continue;
                    }
                    let sensor_a = self.fixtures[contact.fixture_a().0].is_sensor();
                    let sensor_b = self.fixtures[contact.fixture_b().0].is_sensor();
                    if sensor_a || sensor_b {
                        continue;
                    }

                    contact.flags.insert(ContactFlags::ISLAND);
                    self.island.add_contact(edge.contact);

                    if self.bodies[edge.other.0].flags.contains(BodyFlags::ISLAND) {
                        continue;
                    }
                    stack.push(edge.other);
                    self.bodies[edge.other.0].flags.insert(BodyFlags::ISLAND);
                }

                let joint_edges = self.bodies[body_id.0].joint_edges.clone();
                for edge in joint_edges {
                    if self.joints[edge.joint.0].island_flag() {
                        continue;
                    }
                    if !self.bodies[edge.other.0].is_enabled() {
                        continue;
                    }

                    self.joints[edge.joint.0].set_island_flag(true);
                    self.island.add_joint(edge.joint);

                    if self.bodies[edge.other.0].flags.contains(BodyFlags::ISLAND) {
                        continue;
                    }
                    stack.push(edge.other);
                    self.bodies[edge.other.0].flags.insert(BodyFlags::ISLAND);
                }
            }

            self.island.solve(
                step,
                self.gravity,
                self.allow_sleep,
                &mut self.bodies,
                &self.fixtures,
                &mut self.contact_manager.contacts,
                &mut self.joints,
                &mut self.contact_manager.listener,
            );

            // Allow static bodies to participate in other islands.
            for i in 0..self.island.bodies.len() {
                let id = self.island.bodies[i];
                if self.bodies[id.0].body_type() == BodyType::Static {
                    self.bodies[id.0].flags.remove(BodyFlags::ISLAND);
                }
            }
        }

        // Synchronize fixtures and look for new contacts.
        let ids: Vec<BodyId> = self.bodies.iter().map(|(k, _)| BodyId(k)).collect();
        for id in ids {
            let body = &self.bodies[id.0];
            if !body.flags.contains(BodyFlags::ISLAND)
                || body.body_type() == BodyType::Static
            {
                continue;
            }
            self.synchronize_fixtures(id);
        }
        self.contact_manager
            .find_new_contacts(&mut self.bodies, &self.fixtures, &self.joints);
    }

    fn synchronize_fixtures(&mut self, id: BodyId) {
        let body = &self.bodies[id.0];
        let fixture_ids = body.fixtures.clone();
        if body.is_awake() {
            let xf1 = body.sweep.transform(0.0);
            let xf2 = body.xf;
            for fixture in fixture_ids {
                self.fixtures[fixture.0].synchronize(
                    &mut self.contact_manager.broad_phase,
                    &xf1,
                    &xf2,
                );
            }
        } else {
            let xf = body.xf;
            for fixture in fixture_ids {
                self.fixtures[fixture.0].synchronize(
                    &mut self.contact_manager.broad_phase,
                    &xf,
                    &xf,
                );
            }
        }
    }

    /// Continuous collision: find the earliest TOI, advance and resolve that
    /// pair with a small sub-island, and repeat until the step is spent.
    fn solve_toi(&mut self, step: &TimeStep) {
        if self.step_complete {
            for (_, body) in self.bodies.iter_mut() {
                body.flags.remove(BodyFlags::ISLAND);
                body.sweep.alpha0 = 0.0;
            }
            for (_, contact) in self.contact_manager.contacts.iter_mut() {
                contact.flags.remove(ContactFlags::TOI | ContactFlags::ISLAND);
                contact.toi_count = 0;
                contact.toi = 1.0;
            }
        }

        // Find TOI events and solve them one at a time.
        loop {
            let mut min_contact: Option<ContactId> = None;
            let mut min_alpha = 1.0f32;

            let contact_ids = self.contact_manager.contact_ids();
            for id in contact_ids {
                let alpha;
                {
                    let contact = &self.contact_manager.contacts[id.0];
                    if !contact.is_enabled() {
                        continue;
                    }
                    // Prevent excessive sub-stepping of a single pair.
                    if contact.toi_count > tuning::MAX_SUB_STEPS {
                        continue;
                    }

                    if contact.flags.contains(ContactFlags::TOI) {
                        alpha = contact.toi;
                    } else {
                        let fixture_a = &self.fixtures[contact.fixture_a().0];
                        let fixture_b = &self.fixtures[contact.fixture_b().0];
                        if fixture_a.is_sensor() || fixture_b.is_sensor() {
                            continue;
                        }

                        let body_a_id = fixture_a.body();
                        let body_b_id = fixture_b.body();

                        let (type_a, type_b, active_a, active_b, bullet_a, bullet_b) = {
                            let body_a = &self.bodies[body_a_id.0];
                            let body_b = &self.bodies[body_b_id.0];
                            (
                                body_a.body_type(),
                                body_b.body_type(),
                                body_a.is_awake() && body_a.body_type() != BodyType::Static,
                                body_b.is_awake() && body_b.body_type() != BodyType::Static,
                                body_a.is_bullet(),
                                body_b.is_bullet(),
                            )
                        };
                        debug_assert!(
                            type_a == BodyType::Dynamic || type_b == BodyType::Dynamic
                        );

                        // Is at least one body active?
                        if !active_a && !active_b {
                            continue;
                        }

                        // Are these two non-bullet dynamic bodies?
                        let collide_a = bullet_a || type_a != BodyType::Dynamic;
                        let collide_b = bullet_b || type_b != BodyType::Dynamic;
                        if !collide_a && !collide_b {
                            continue;
                        }

                        // Advance both sweeps to the later alpha0.
                        let alpha0 = {
                            let alpha0_a = self.bodies[body_a_id.0].sweep.alpha0;
                            let alpha0_b = self.bodies[body_b_id.0].sweep.alpha0;
                            let alpha0 = alpha0_a.max(alpha0_b);
                            if alpha0_a < alpha0 {
                                self.bodies[body_a_id.0].sweep.advance(alpha0);
                            }
                            if alpha0_b < alpha0 {
                                self.bodies[body_b_id.0].sweep.advance(alpha0);
                            }
                            alpha0
                        };
                        debug_assert!(alpha0 < 1.0);

                        let (child_a, child_b) = {
                            let contact = &self.contact_manager.contacts[id.0];
                            (contact.child_index_a(), contact.child_index_b())
                        };
                        let proxy_a =
                            DistanceProxy::new(self.fixtures[contact.fixture_a().0].shape(), child_a);
                        let proxy_b =
                            DistanceProxy::new(self.fixtures[contact.fixture_b().0].shape(), child_b);

                        let output = time_of_impact(&ToiInput {
                            proxy_a: &proxy_a,
                            proxy_b: &proxy_b,
                            sweep_a: self.bodies[body_a_id.0].sweep,
                            sweep_b: self.bodies[body_b_id.0].sweep,
                            t_max: 1.0,
                        });

                        // A failed TOI counts as touching at the best time.
                        let beta = output.t;
                        alpha = if output.state == ToiState::Touching
                            || output.state == ToiState::Failed
                        {
                            (alpha0 + (1.0 - alpha0) * beta).min(1.0)
                        } else {
                            1.0
                        };
                    }
                }
                {
                    let contact = &mut self.contact_manager.contacts[id.0];
                    contact.toi = alpha;
                    contact.flags.insert(ContactFlags::TOI);
                }

                if alpha < min_alpha {
                    min_contact = Some(id);
                    min_alpha = alpha;
                }
            }

            let Some(min_contact_id) = min_contact else {
                self.step_complete = true;
                break;
            };
            if min_alpha > 1.0 - 10.0 * f32::EPSILON {
                // No more TOI events; the step is done.
                self.step_complete = true;
                break;
            }

            // Advance the bodies to the TOI.
            let (fixture_a_id, fixture_b_id) = {
                let contact = &self.contact_manager.contacts[min_contact_id.0];
                (contact.fixture_a(), contact.fixture_b())
            };
            let body_a_id = self.fixtures[fixture_a_id.0].body();
            let body_b_id = self.fixtures[fixture_b_id.0].body();

            let backup_a = self.bodies[body_a_id.0].sweep;
            let backup_b = self.bodies[body_b_id.0].sweep;

            self.bodies[body_a_id.0].advance(min_alpha);
            self.bodies[body_b_id.0].advance(min_alpha);

            // The TOI contact needs a fresh manifold at the impact pose.
            self.contact_manager
                .update_contact(min_contact_id, &mut self.bodies, &self.fixtures);
            {
                let contact = &mut self.contact_manager.contacts[min_contact_id.0];
                contact.flags.remove(ContactFlags::TOI);
                contact.toi_count += 1;

                if !contact.is_enabled() || !contact.is_touching() {
                    // Restore the sweeps; the contact evaporated at the TOI.
                    contact.set_enabled(false);
                    self.bodies[body_a_id.0].sweep = backup_a;
                    self.bodies[body_b_id.0].sweep = backup_b;
                    self.bodies[body_a_id.0].synchronize_transform();
                    self.bodies[body_b_id.0].synchronize_transform();
                    continue;
                }
            }

            self.bodies[body_a_id.0].set_awake(true);
            self.bodies[body_b_id.0].set_awake(true);

            if self.bodies[body_a_id.0].is_bullet() || self.bodies[body_b_id.0].is_bullet() {
                self.contact_manager.contacts[min_contact_id.0]
                    .flags
                    .insert(ContactFlags::BULLET_HIT);
            }

            // Build the TOI sub-island: the pair plus whatever the pair is
            // touching, within hard caps.
            self.island.clear();
            self.island.add_body(body_a_id, &mut self.bodies);
            self.island.add_body(body_b_id, &mut self.bodies);
            self.island.add_contact(min_contact_id);

            self.bodies[body_a_id.0].flags.insert(BodyFlags::ISLAND);
            self.bodies[body_b_id.0].flags.insert(BodyFlags::ISLAND);
            self.contact_manager.contacts[min_contact_id.0]
                .flags
                .insert(ContactFlags::ISLAND);

            for body_id in [body_a_id, body_b_id] {
                if self.bodies[body_id.0].body_type() != BodyType::Dynamic {
                    continue;
                }
                let edges = self.bodies[body_id.0].contact_edges.clone();
                for edge in edges {
                    if self.island.bodies.len() >= 2 * tuning::MAX_TOI_CONTACTS {
                        break;
                    }
                    if self.island.contacts.len() >= tuning::MAX_TOI_CONTACTS {
                        break;
                    }

                    let contact_id = edge.contact;
                    if self.contact_manager.contacts[contact_id.0]
                        .flags
                        .contains(ContactFlags::ISLAND)
                    {
                        continue;
                    }

                    // Only bullets perform TOI against moving dynamics.
                    let other = edge.other;
                    {
                        let other_body = &self.bodies[other.0];
                        if other_body.body_type() == BodyType::Dynamic
                            && !self.bodies[body_id.0].is_bullet()
                            && !other_body.is_bullet()
                        {
                            continue;
                        }
                    }

                    let sensor_a = self.fixtures
                        [self.contact_manager.contacts[contact_id.0].fixture_a().0]
                        .is_sensor();
                    let sensor_b = self.fixtures
                        [self.contact_manager.contacts[contact_id.0].fixture_b().0]
                        .is_sensor();
                    if sensor_a || sensor_b {
                        continue;
                    }

                    // Tentatively advance the other body to the TOI.
                    let backup = self.bodies[other.0].sweep;
                    if !self.bodies[other.0].flags.contains(BodyFlags::ISLAND) {
                        self.bodies[other.0].advance(min_alpha);
                    }

                    self.contact_manager
                        .update_contact(contact_id, &mut self.bodies, &self.fixtures);

                    let contact = &self.contact_manager.contacts[contact_id.0];
                    if !contact.is_enabled() || !contact.is_touching() {
                        self.bodies[other.0].sweep = backup;
                        self.bodies[other.0].synchronize_transform();
                        continue;
                    }

                    self.contact_manager.contacts[contact_id.0]
                        .flags
                        .insert(ContactFlags::ISLAND);
                    self.island.add_contact(contact_id);

                    if self.bodies[other.0].flags.contains(BodyFlags::ISLAND) {
                        continue;
                    }
                    self.bodies[other.0].flags.insert(BodyFlags::ISLAND);
                    if self.bodies[other.0].body_type() != BodyType::Static {
                        self.bodies[other.0].set_awake(true);
                    }
                    self.island.add_body(other, &mut self.bodies);
                }
            }

            let sub_dt = (1.0 - min_alpha) * step.dt;
            let sub_step = TimeStep {
                dt: sub_dt,
                inv_dt: if sub_dt > 0.0 { 1.0 / sub_dt } else { 0.0 },
                dt_ratio: 1.0,
                velocity_iterations: step.velocity_iterations,
                position_iterations: 20,
                warm_starting: false,
            };
            let index_a = self.bodies[body_a_id.0].island_index;
            let index_b = self.bodies[body_b_id.0].island_index;
            self.island.solve_toi(
                &sub_step,
                index_a,
                index_b,
                &mut self.bodies,
                &self.fixtures,
                &mut self.contact_manager.contacts,
                &mut self.contact_manager.listener,
            );

            // Reset island and TOI flags so later events re-evaluate.
            for i in 0..self.island.bodies.len() {
                let body_id = self.island.bodies[i];
                self.bodies[body_id.0].flags.remove(BodyFlags::ISLAND);
                if self.bodies[body_id.0].body_type() != BodyType::Dynamic {
                    continue;
                }
                self.synchronize_fixtures(body_id);

                let edges = self.bodies[body_id.0].contact_edges.clone();
                for edge in edges {
                    self.contact_manager.contacts[edge.contact.0]
                        .flags
                        .remove(ContactFlags::TOI | ContactFlags::ISLAND);
                }
            }

            // The moves above may have created new pairs that also need TOI
            // handling this step.
            self.contact_manager
                .find_new_contacts(&mut self.bodies, &self.fixtures, &self.joints);

            if self.sub_stepping {
                self.step_complete = false;
                break;
            }
        }
    }

    // -------------------------------------------------------------------
    // Queries

    /// Invoke `callback` for each fixture whose fat AABB overlaps `aabb`.
    /// Return false from the callback to stop early.
    pub fn query_aabb<F: FnMut(FixtureId) -> bool>(&self, aabb: Aabb, mut callback: F) {
        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.query(aabb, |proxy_id| {
            let proxy = broad_phase.user_data(proxy_id);
            callback(proxy.fixture)
        });
    }

    /// Collect fixtures matching an AABB and query filter.
    pub fn overlap_aabb(&self, aabb: Aabb, filter: QueryFilter) -> Vec<FixtureId> {
        let mut out = Vec::new();
        self.query_aabb(aabb, |fixture| {
            if filter.accepts(self.fixtures[fixture.0].filter()) {
                out.push(fixture);
            }
            true
        });
        out
    }

    /// Cast a ray and invoke `callback` for each fixture hit.
    ///
    /// The callback controls the query through its return value: 0 terminates,
    /// the hit fraction clips the ray to the hit, 1 continues unclipped, and a
    /// negative value ignores the hit.
    pub fn ray_cast<F>(&self, p1: Vec2, p2: Vec2, mut callback: F)
    where
        F: FnMut(FixtureId, Vec2, Vec2, f32) -> f32,
    {
        let broad_phase = &self.contact_manager.broad_phase;
        let input = RayCastInput {
            p1,
            p2,
            max_fraction: 1.0,
        };
        broad_phase.ray_cast(&input, |sub_input, proxy_id| {
            let proxy = broad_phase.user_data(proxy_id);
            let fixture = &self.fixtures[proxy.fixture.0];
            let xf = self.bodies[fixture.body().0].transform();
            if let Some(output) = fixture.ray_cast(sub_input, xf, proxy.child) {
                let fraction = output.fraction;
                let point = p1 * (1.0 - fraction) + p2 * fraction;
                return callback(proxy.fixture, point, output.normal, fraction);
            }
            sub_input.max_fraction
        });
    }

    /// Closest-hit ray cast convenience.
    pub fn cast_ray_closest(&self, p1: Vec2, p2: Vec2, filter: QueryFilter) -> Option<RayResult> {
        let mut closest: Option<RayResult> = None;
        self.ray_cast(p1, p2, |fixture, point, normal, fraction| {
            if !filter.accepts(self.fixtures[fixture.0].filter()) {
                // Filtered out; continue as if nothing was hit.
                return -1.0;
            }
            closest = Some(RayResult {
                fixture,
                point,
                normal,
                fraction,
            });
            // Clip the ray to this hit and keep looking for closer ones.
            fraction
        });
        closest
    }

    /// Exact overlap test between two shape children at given transforms.
    pub fn test_overlap(
        shape_a: &Shape,
        index_a: usize,
        shape_b: &Shape,
        index_b: usize,
        xf_a: Transform,
        xf_b: Transform,
    ) -> bool {
        crate::collision::test_overlap(shape_a, index_a, shape_b, index_b, xf_a, xf_b)
    }

    /// Broad-phase tree diagnostics: (height, node count).
    pub fn broad_phase_metrics(&self) -> (i32, usize) {
        let tree = self.contact_manager.broad_phase.tree();
        (tree.height(), tree.node_count())
    }
}
