//! Motor joint: drives the relative transform of two bodies toward a target
//! linear and angular offset with bounded force and torque. Useful for
//! animated or player-driven motion that still respects collisions.

use slab::Slab;

use crate::body::Body;
use crate::core::math::{Mat22, Rot};
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::types::{cross_scalar_vec, Vec2};

/// Motor joint definition. The offsets are measured in body A's frame.
#[derive(Clone, Debug)]
pub struct MotorJointDef {
    pub base: JointBase,
    pub linear_offset: Vec2,
    pub angular_offset: f32,
    pub max_force: f32,
    pub max_torque: f32,
    /// Position correction gain in (0, 1].
    pub correction_factor: f32,
}

impl MotorJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            linear_offset: Vec2::ZERO,
            angular_offset: 0.0,
            max_force: 1.0,
            max_torque: 1.0,
            correction_factor: 0.3,
        }
    }

    pub fn linear_offset<V: Into<Vec2>>(mut self, v: V) -> Self {
        self.linear_offset = v.into();
        self
    }

    pub fn angular_offset(mut self, v: f32) -> Self {
        self.angular_offset = v;
        self
    }

    pub fn max_force(mut self, v: f32) -> Self {
        debug_assert!(v >= 0.0);
        self.max_force = v;
        self
    }

    pub fn max_torque(mut self, v: f32) -> Self {
        debug_assert!(v >= 0.0);
        self.max_torque = v;
        self
    }

    pub fn correction_factor(mut self, v: f32) -> Self {
        debug_assert!((0.0..=1.0).contains(&v));
        self.correction_factor = v;
        self
    }

    /// Capture the current relative pose as the target offsets.
    pub fn from_current_pose(mut self, bodies: &Slab<Body>) -> Self {
        let body_a = &bodies[self.base.body_a.0];
        let body_b = &bodies[self.base.body_b.0];
        self.linear_offset = body_a.local_point(body_b.position());
        self.angular_offset = body_b.angle() - body_a.angle();
        self
    }
}

#[derive(Clone, Debug)]
pub struct MotorJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    linear_offset: Vec2,
    angular_offset: f32,
    max_force: f32,
    max_torque: f32,
    correction_factor: f32,

    linear_impulse: Vec2,
    angular_impulse: f32,

    cache: JointSolverCache,
    ra: Vec2,
    rb: Vec2,
    linear_error: Vec2,
    angular_error: f32,
    linear_mass: Mat22,
    angular_mass: f32,
}

impl MotorJoint {
    pub(crate) fn new(def: &MotorJointDef) -> Self {
        Self {
            base: def.base,
            island_flag: false,
            linear_offset: def.linear_offset,
            angular_offset: def.angular_offset,
            max_force: def.max_force,
            max_torque: def.max_torque,
            correction_factor: def.correction_factor,
            linear_impulse: Vec2::ZERO,
            angular_impulse: 0.0,
            cache: JointSolverCache::default(),
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            linear_error: Vec2::ZERO,
            angular_error: 0.0,
            linear_mass: Mat22::default(),
            angular_mass: 0.0,
        }
    }

    pub fn set_linear_offset<V: Into<Vec2>>(&mut self, v: V) {
        self.linear_offset = v.into();
    }

    pub fn linear_offset(&self) -> Vec2 {
        self.linear_offset
    }

    pub fn set_angular_offset(&mut self, v: f32) {
        self.angular_offset = v;
    }

    pub fn angular_offset(&self) -> f32 {
        self.angular_offset
    }

    pub fn set_max_force(&mut self, v: f32) {
        debug_assert!(v >= 0.0);
        self.max_force = v;
    }

    pub fn set_max_torque(&mut self, v: f32) {
        debug_assert!(v >= 0.0);
        self.max_torque = v;
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].position()
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].position()
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.linear_impulse * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.angular_impulse * inv_dt
    }

    pub(crate) fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &Slab<Body>) {
        self.cache = JointSolverCache::gather(&self.base, bodies);
        let c = self.cache;

        let c_a = data.positions[c.index_a].c;
        let a_a = data.positions[c.index_a].a;
        let c_b = data.positions[c.index_b].c;
        let a_b = data.positions[c.index_b].a;
        let q_a = Rot::from_radians(a_a);
        let q_b = Rot::from_radians(a_b);

        self.ra = q_a.rotate_vec(self.linear_offset - c.local_center_a);
        self.rb = q_b.rotate_vec(-c.local_center_b);

        let m_a = c.inv_mass_a;
        let m_b = c.inv_mass_b;
        let i_a = c.inv_i_a;
        let i_b = c.inv_i_b;

        let k = Mat22::new(
            Vec2::new(
                m_a + m_b + i_a * self.ra.y * self.ra.y + i_b * self.rb.y * self.rb.y,
                -i_a * self.ra.x * self.ra.y - i_b * self.rb.x * self.rb.y,
            ),
            Vec2::new(
                -i_a * self.ra.x * self.ra.y - i_b * self.rb.x * self.rb.y,
                m_a + m_b + i_a * self.ra.x * self.ra.x + i_b * self.rb.x * self.rb.x,
            ),
        );
        self.linear_mass = k.inverse();

        self.angular_mass = i_a + i_b;
        if self.angular_mass > 0.0 {
            self.angular_mass = 1.0 / self.angular_mass;
        }

        self.linear_error = c_b + self.rb - c_a - self.ra;
        self.angular_error = a_b - a_a - self.angular_offset;

        if data.step.warm_starting {
            self.linear_impulse *= data.step.dt_ratio;
            self.angular_impulse *= data.step.dt_ratio;

            let p = self.linear_impulse;
            data.velocities[c.index_a].v -= p * m_a;
            data.velocities[c.index_a].w -= i_a * (self.ra.cross(p) + self.angular_impulse);
            data.velocities[c.index_b].v += p * m_b;
            data.velocities[c.index_b].w += i_b * (self.rb.cross(p) + self.angular_impulse);
        } else {
            self.linear_impulse = Vec2::ZERO;
            self.angular_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let c = self.cache;
        let m_a = c.inv_mass_a;
        let m_b = c.inv_mass_b;
        let i_a = c.inv_i_a;
        let i_b = c.inv_i_b;

        let mut v_a = data.velocities[c.index_a].v;
        let mut w_a = data.velocities[c.index_a].w;
        let mut v_b = data.velocities[c.index_b].v;
        let mut w_b = data.velocities[c.index_b].w;

        let h = data.step.dt;
        let inv_h = data.step.inv_dt;

        // Angular part.
        {
            let c_dot = w_b - w_a + inv_h * self.correction_factor * self.angular_error;
            let mut impulse = -self.angular_mass * c_dot;

            let old_impulse = self.angular_impulse;
            let max_impulse = self.max_torque * h;
            self.angular_impulse =
                (self.angular_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.angular_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Linear part.
        {
            let c_dot = v_b + cross_scalar_vec(w_b, self.rb)
                - v_a
                - cross_scalar_vec(w_a, self.ra)
                + self.linear_error * (inv_h * self.correction_factor);

            let mut impulse = -self.linear_mass.mul_vec(c_dot);
            let old_impulse = self.linear_impulse;
            self.linear_impulse += impulse;

            let max_impulse = self.max_force * h;
            if self.linear_impulse.length_squared() > max_impulse * max_impulse {
                self.linear_impulse = self.linear_impulse.normalized() * max_impulse;
            }
            impulse = self.linear_impulse - old_impulse;

            v_a -= impulse * m_a;
            w_a -= i_a * self.ra.cross(impulse);
            v_b += impulse * m_b;
            w_b += i_b * self.rb.cross(impulse);
        }

        data.velocities[c.index_a].v = v_a;
        data.velocities[c.index_a].w = w_a;
        data.velocities[c.index_b].v = v_b;
        data.velocities[c.index_b].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, _data: &mut SolverData) -> bool {
        // Position error is fed back through the velocity bias.
        true
    }
}
