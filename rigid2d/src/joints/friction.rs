//! Friction joint: applies top-down friction, clamping relative linear and
//! angular velocity with bounded force and torque.

use slab::Slab;

use crate::body::Body;
use crate::core::math::{Mat22, Rot};
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::types::{cross_scalar_vec, Vec2};

/// Friction joint definition.
#[derive(Clone, Debug)]
pub struct FrictionJointDef {
    pub base: JointBase,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub max_force: f32,
    pub max_torque: f32,
}

impl FrictionJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            max_force: 0.0,
            max_torque: 0.0,
        }
    }

    pub fn local_anchor_a<V: Into<Vec2>>(mut self, v: V) -> Self {
        self.local_anchor_a = v.into();
        self
    }

    pub fn local_anchor_b<V: Into<Vec2>>(mut self, v: V) -> Self {
        self.local_anchor_b = v.into();
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

    pub fn world_anchor<V: Into<Vec2>>(mut self, bodies: &Slab<Body>, anchor: V) -> Self {
        let anchor = anchor.into();
        self.local_anchor_a = bodies[self.base.body_a.0].local_point(anchor);
        self.local_anchor_b = bodies[self.base.body_b.0].local_point(anchor);
        self
    }
}

#[derive(Clone, Debug)]
pub struct FrictionJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    max_force: f32,
    max_torque: f32,

    linear_impulse: Vec2,
    angular_impulse: f32,

    cache: JointSolverCache,
    ra: Vec2,
    rb: Vec2,
    linear_mass: Mat22,
    angular_mass: f32,
}

impl FrictionJoint {
    pub(crate) fn new(def: &FrictionJointDef) -> Self {
        Self {
            base: def.base,
            island_flag: false,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_force: def.max_force,
            max_torque: def.max_torque,
            linear_impulse: Vec2::ZERO,
            angular_impulse: 0.0,
            cache: JointSolverCache::default(),
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            linear_mass: Mat22::default(),
            angular_mass: 0.0,
        }
    }

    pub fn set_max_force(&mut self, v: f32) {
        debug_assert!(v >= 0.0);
        self.max_force = v;
    }

    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    pub fn set_max_torque(&mut self, v: f32) {
        debug_assert!(v >= 0.0);
        self.max_torque = v;
    }

    pub fn max_torque(&self) -> f32 {
        self.max_torque
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].world_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
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

        let a_a = data.positions[c.index_a].a;
        let a_b = data.positions[c.index_b].a;
        let q_a = Rot::from_radians(a_a);
        let q_b = Rot::from_radians(a_b);

        self.ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
        self.rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);

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

        // Angular friction.
        {
            let c_dot = w_b - w_a;
            let mut impulse = -self.angular_mass * c_dot;

            let old_impulse = self.angular_impulse;
            let max_impulse = self.max_torque * h;
            self.angular_impulse =
                (self.angular_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.angular_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Linear friction.
        {
            let c_dot =
                v_b + cross_scalar_vec(w_b, self.rb) - v_a - cross_scalar_vec(w_a, self.ra);

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
        // Friction has no position error to correct.
        true
    }
}
