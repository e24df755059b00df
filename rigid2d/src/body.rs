//! Rigid bodies.

use bitflags::bitflags;

use crate::core::math::{Rot, Sweep, Transform};
use crate::shapes::MassData;
use crate::types::{BodyId, ContactId, FixtureId, JointId, Vec2};

/// Body types.
///
/// - `Static`: zero mass, zero velocity, moved only by hand.
/// - `Kinematic`: zero mass, velocity set by the user.
/// - `Dynamic`: positive mass, full simulation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BodyType {
    Static,
    Kinematic,
    Dynamic,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub(crate) struct BodyFlags: u32 {
        const ISLAND = 0x0001;
        const AWAKE = 0x0002;
        const AUTO_SLEEP = 0x0004;
        const BULLET = 0x0008;
        const FIXED_ROTATION = 0x0010;
        const ENABLED = 0x0020;
        const IGNORE_GRAVITY = 0x0040;
        const TOI = 0x0080;
    }
}

/// Body definition with builder API.
#[derive(Clone, Debug)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub allow_sleep: bool,
    pub awake: bool,
    pub fixed_rotation: bool,
    pub bullet: bool,
    pub enabled: bool,
    pub ignore_gravity: bool,
    pub gravity_scale: f32,
    pub user_data: u64,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            bullet: false,
            enabled: true,
            ignore_gravity: false,
            gravity_scale: 1.0,
            user_data: 0,
        }
    }
}

impl BodyDef {
    pub fn builder() -> BodyBuilder {
        BodyBuilder::new()
    }
}

/// Fluent builder for `BodyDef`.
#[derive(Clone, Debug, Default)]
pub struct BodyBuilder {
    def: BodyDef,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self {
            def: BodyDef::default(),
        }
    }
    /// Set the body type (static, kinematic, dynamic).
    pub fn body_type(mut self, t: BodyType) -> Self {
        self.def.body_type = t;
        self
    }
    /// Initial world-space position.
    pub fn position<V: Into<Vec2>>(mut self, p: V) -> Self {
        self.def.position = p.into();
        self
    }
    /// Initial rotation in radians.
    pub fn angle(mut self, radians: f32) -> Self {
        self.def.angle = radians;
        self
    }
    /// Initial linear velocity (m/s).
    pub fn linear_velocity<V: Into<Vec2>>(mut self, v: V) -> Self {
        self.def.linear_velocity = v.into();
        self
    }
    /// Initial angular velocity (rad/s).
    pub fn angular_velocity(mut self, v: f32) -> Self {
        self.def.angular_velocity = v;
        self
    }
    /// Linear damping (drag-like term).
    pub fn linear_damping(mut self, v: f32) -> Self {
        self.def.linear_damping = v;
        self
    }
    /// Angular damping.
    pub fn angular_damping(mut self, v: f32) -> Self {
        self.def.angular_damping = v;
        self
    }
    /// Per-body gravity scale (1 = normal gravity).
    pub fn gravity_scale(mut self, v: f32) -> Self {
        self.def.gravity_scale = v;
        self
    }
    /// Allow body to go to sleep.
    pub fn allow_sleep(mut self, flag: bool) -> Self {
        self.def.allow_sleep = flag;
        self
    }
    /// Awake/asleep flag at creation.
    pub fn awake(mut self, flag: bool) -> Self {
        self.def.awake = flag;
        self
    }
    /// Prevent rotation (infinite inertia).
    pub fn fixed_rotation(mut self, flag: bool) -> Self {
        self.def.fixed_rotation = flag;
        self
    }
    /// Treat as bullet (continuous collision against other dynamics).
    pub fn bullet(mut self, flag: bool) -> Self {
        self.def.bullet = flag;
        self
    }
    /// Enable/disable simulation for this body.
    pub fn enabled(mut self, flag: bool) -> Self {
        self.def.enabled = flag;
        self
    }
    /// Skip world gravity for this body.
    pub fn ignore_gravity(mut self, flag: bool) -> Self {
        self.def.ignore_gravity = flag;
        self
    }
    /// Opaque user handle.
    pub fn user_data(mut self, v: u64) -> Self {
        self.def.user_data = v;
        self
    }

    #[must_use]
    pub fn build(self) -> BodyDef {
        self.def
    }
}

/// Edge into a body's contact list: the other body and the shared contact.
#[derive(Copy, Clone, Debug)]
pub struct ContactEdge {
    pub other: BodyId,
    pub contact: ContactId,
}

/// Edge into a body's joint list.
#[derive(Copy, Clone, Debug)]
pub struct JointEdge {
    pub other: BodyId,
    pub joint: JointId,
}

/// A rigid body: transform, velocity, mass, and the fixtures/joints/contacts
/// attached to it. Owned by a world and addressed by [`BodyId`].
#[derive(Clone, Debug)]
pub struct Body {
    pub(crate) body_type: BodyType,
    pub(crate) flags: BodyFlags,
    pub(crate) island_index: usize,
    pub(crate) xf: Transform,
    pub(crate) sweep: Sweep,
    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,
    pub(crate) force: Vec2,
    pub(crate) torque: f32,
    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    pub(crate) inertia: f32,
    pub(crate) inv_inertia: f32,
    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) gravity_scale: f32,
    pub(crate) sleep_time: f32,
    pub(crate) fixtures: Vec<FixtureId>,
    pub(crate) contact_edges: Vec<ContactEdge>,
    pub(crate) joint_edges: Vec<JointEdge>,
    pub user_data: u64,
}

impl Body {
    pub(crate) fn new(def: &BodyDef) -> Body {
        debug_assert!(def.position.is_valid());
        debug_assert!(def.linear_velocity.is_valid());
        debug_assert!(def.angle.is_finite());
        debug_assert!(def.angular_velocity.is_finite());
        debug_assert!(def.linear_damping >= 0.0);
        debug_assert!(def.angular_damping >= 0.0);

        let mut flags = BodyFlags::empty();
        flags.set(BodyFlags::BULLET, def.bullet);
        flags.set(BodyFlags::FIXED_ROTATION, def.fixed_rotation);
        flags.set(BodyFlags::AUTO_SLEEP, def.allow_sleep);
        flags.set(BodyFlags::AWAKE, def.awake);
        flags.set(BodyFlags::ENABLED, def.enabled);
        flags.set(BodyFlags::IGNORE_GRAVITY, def.ignore_gravity);

        let xf = Transform::from_pos_angle(def.position, def.angle);
        let sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: xf.p,
            c: xf.p,
            a0: def.angle,
            a: def.angle,
            alpha0: 0.0,
        };

        let (mass, inv_mass) = if def.body_type == BodyType::Dynamic {
            (1.0, 1.0)
        } else {
            (0.0, 0.0)
        };

        Body {
            body_type: def.body_type,
            flags,
            island_index: 0,
            xf,
            sweep,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            sleep_time: 0.0,
            fixtures: Vec::new(),
            contact_edges: Vec::new(),
            joint_edges: Vec::new(),
            user_data: def.user_data,
        }
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn transform(&self) -> &Transform {
        &self.xf
    }

    pub fn position(&self) -> Vec2 {
        self.xf.p
    }

    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    pub fn set_linear_velocity<V: Into<Vec2>>(&mut self, v: V) {
        if self.body_type == BodyType::Static {
            return;
        }
        let v = v.into();
        if v.dot(v) > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = v;
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, w: f32) {
        if self.body_type == BodyType::Static {
            return;
        }
        if w * w > 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = w;
    }

    /// Apply a force at a world point, waking the body if requested. Forces
    /// on sleeping bodies are dropped rather than queued.
    pub fn apply_force<V: Into<Vec2>, P: Into<Vec2>>(&mut self, force: V, point: P, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            let force = force.into();
            let point = point.into();
            self.force += force;
            self.torque += (point - self.sweep.c).cross(force);
        }
    }

    pub fn apply_force_to_center<V: Into<Vec2>>(&mut self, force: V, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.force += force.into();
        }
    }

    pub fn apply_torque(&mut self, torque: f32, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.torque += torque;
        }
    }

    pub fn apply_linear_impulse<V: Into<Vec2>, P: Into<Vec2>>(
        &mut self,
        impulse: V,
        point: P,
        wake: bool,
    ) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            let impulse = impulse.into();
            let point = point.into();
            self.linear_velocity += impulse * self.inv_mass;
            self.angular_velocity += self.inv_inertia * (point - self.sweep.c).cross(impulse);
        }
    }

    pub fn apply_linear_impulse_to_center<V: Into<Vec2>>(&mut self, impulse: V, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.linear_velocity += impulse.into() * self.inv_mass;
        }
    }

    pub fn apply_angular_impulse(&mut self, impulse: f32, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake {
            self.set_awake(true);
        }
        if self.is_awake() {
            self.angular_velocity += self.inv_inertia * impulse;
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inertia(&self) -> f32 {
        self.inertia + self.mass * self.sweep.local_center.dot(self.sweep.local_center)
    }

    pub fn mass_data(&self) -> MassData {
        MassData {
            mass: self.mass,
            center: self.sweep.local_center,
            inertia: self.inertia(),
        }
    }

    pub fn world_point(&self, local_point: Vec2) -> Vec2 {
        self.xf.transform_point(local_point)
    }

    pub fn world_vector(&self, local_vector: Vec2) -> Vec2 {
        self.xf.q.rotate_vec(local_vector)
    }

    pub fn local_point(&self, world_point: Vec2) -> Vec2 {
        self.xf.inv_transform_point(world_point)
    }

    pub fn local_vector(&self, world_vector: Vec2) -> Vec2 {
        self.xf.q.inv_rotate_vec(world_vector)
    }

    pub fn linear_velocity_from_world_point(&self, world_point: Vec2) -> Vec2 {
        self.linear_velocity
            + crate::types::cross_scalar_vec(self.angular_velocity, world_point - self.sweep.c)
    }

    pub fn linear_velocity_from_local_point(&self, local_point: Vec2) -> Vec2 {
        self.linear_velocity_from_world_point(self.world_point(local_point))
    }

    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping;
    }

    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping;
    }

    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    pub fn is_bullet(&self) -> bool {
        self.flags.contains(BodyFlags::BULLET)
    }

    pub fn set_bullet(&mut self, flag: bool) {
        self.flags.set(BodyFlags::BULLET, flag);
    }

    pub fn set_awake(&mut self, flag: bool) {
        if self.body_type == BodyType::Static {
            return;
        }
        if flag {
            if !self.flags.contains(BodyFlags::AWAKE) {
                self.flags.insert(BodyFlags::AWAKE);
                self.sleep_time = 0.0;
            }
        } else {
            self.flags.remove(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(BodyFlags::ENABLED)
    }

    pub fn is_fixed_rotation(&self) -> bool {
        self.flags.contains(BodyFlags::FIXED_ROTATION)
    }

    pub fn is_sleeping_allowed(&self) -> bool {
        self.flags.contains(BodyFlags::AUTO_SLEEP)
    }

    pub fn set_sleeping_allowed(&mut self, flag: bool) {
        if flag {
            self.flags.insert(BodyFlags::AUTO_SLEEP);
        } else {
            self.flags.remove(BodyFlags::AUTO_SLEEP);
            self.set_awake(true);
        }
    }

    pub fn is_gravity_ignored(&self) -> bool {
        self.flags.contains(BodyFlags::IGNORE_GRAVITY)
    }

    pub fn set_gravity_ignored(&mut self, flag: bool) {
        self.flags.set(BodyFlags::IGNORE_GRAVITY, flag);
    }

    pub fn fixtures(&self) -> &[FixtureId] {
        &self.fixtures
    }

    pub fn contact_edges(&self) -> &[ContactEdge] {
        &self.contact_edges
    }

    pub fn joint_edges(&self) -> &[JointEdge] {
        &self.joint_edges
    }

    /// Update `xf` from the sweep end state.
    pub(crate) fn synchronize_transform(&mut self) {
        self.xf.q = Rot::from_radians(self.sweep.a);
        self.xf.p = self.sweep.c - self.xf.q.rotate_vec(self.sweep.local_center);
    }

    /// Advance the body to `alpha` of the current sub-step and refresh the
    /// transform, used by the TOI solver.
    pub(crate) fn advance(&mut self, alpha: f32) {
        self.sweep.advance(alpha);
        self.sweep.c = self.sweep.c0;
        self.sweep.a = self.sweep.a0;
        self.synchronize_transform();
    }

    pub(crate) fn remove_contact_edge(&mut self, contact: ContactId) {
        if let Some(pos) = self.contact_edges.iter().position(|e| e.contact == contact) {
            self.contact_edges.swap_remove(pos);
        }
    }

    pub(crate) fn remove_joint_edge(&mut self, joint: JointId) {
        if let Some(pos) = self.joint_edges.iter().position(|e| e.joint == joint) {
            self.joint_edges.swap_remove(pos);
        }
    }

    /// True unless a joint connecting these bodies forbids collision.
    pub(crate) fn should_collide_connected(
        &self,
        other_id: BodyId,
        collide_connected: impl Fn(JointId) -> bool,
    ) -> bool {
        for edge in &self.joint_edges {
            if edge.other == other_id && !collide_connected(edge.joint) {
                return false;
            }
        }
        true
    }
}
