//! Weld joint: locks all relative motion between two bodies, optionally with
//! a torsional spring on the angular part.

use slab::Slab;

use crate::body::Body;
use crate::core::math::{Mat33, Rot, Vec3};
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{cross_scalar_vec, Vec2};

/// Weld joint definition.
#[derive(Clone, Debug)]
pub struct WeldJointDef {
    pub base: JointBase,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub reference_angle: f32,
    /// Angular stiffness in N*m; zero makes the weld rigid.
    pub stiffness: f32,
    pub damping: f32,
}

impl WeldJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
            stiffness: 0.0,
            damping: 0.0,
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

    pub fn reference_angle(mut self, v: f32) -> Self {
        self.reference_angle = v;
        self
    }

    pub fn stiffness(mut self, v: f32) -> Self {
        self.stiffness = v;
        self
    }

    pub fn damping(mut self, v: f32) -> Self {
        self.damping = v;
        self
    }

    pub fn world_anchor<V: Into<Vec2>>(mut self, bodies: &Slab<Body>, anchor: V) -> Self {
        let anchor = anchor.into();
        let body_a = &bodies[self.base.body_a.0];
        let body_b = &bodies[self.base.body_b.0];
        self.local_anchor_a = body_a.local_point(anchor);
        self.local_anchor_b = body_b.local_point(anchor);
        self.reference_angle = body_b.angle() - body_a.angle();
        self
    }
}

#[derive(Clone, Debug)]
pub struct WeldJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f32,
    stiffness: f32,
    damping: f32,

    impulse: Vec3,
    gamma: f32,
    bias: f32,

    cache: JointSolverCache,
    ra: Vec2,
    rb: Vec2,
    mass: Mat33,
}

impl WeldJoint {
    pub(crate) fn new(def: &WeldJointDef) -> Self {
        Self {
            base: def.base,
            island_flag: false,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            stiffness: def.stiffness,
            damping: def.damping,
            impulse: Vec3::ZERO,
            gamma: 0.0,
            bias: 0.0,
            cache: JointSolverCache::default(),
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            mass: Mat33::default(),
        }
    }

    pub fn set_stiffness(&mut self, v: f32) {
        self.stiffness = v;
    }

    pub fn set_damping(&mut self, v: f32) {
        self.damping = v;
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].world_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        Vec2::new(self.impulse.x, self.impulse.y) * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.impulse.z * inv_dt
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

        let mut k = Mat33::default();
        k.ex.x = m_a + m_b + self.ra.y * self.ra.y * i_a + self.rb.y * self.rb.y * i_b;
        k.ey.x = -self.ra.y * self.ra.x * i_a - self.rb.y * self.rb.x * i_b;
        k.ez.x = -self.ra.y * i_a - self.rb.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + self.ra.x * self.ra.x * i_a + self.rb.x * self.rb.x * i_b;
        k.ez.y = self.ra.x * i_a + self.rb.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;

        if self.stiffness > 0.0 {
            self.mass = k.get_inverse22();

            let mut inv_m = i_a + i_b;
            let error = a_b - a_a - self.reference_angle;

            let h = data.step.dt;
            self.gamma = h * (self.damping + h * self.stiffness);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = error * h * self.stiffness * self.gamma;

            inv_m += self.gamma;
            self.mass.ez.z = if inv_m != 0.0 { 1.0 / inv_m } else { 0.0 };
        } else if k.ez.z == 0.0 {
            self.mass = k.get_inverse22();
            self.gamma = 0.0;
            self.bias = 0.0;
        } else {
            self.mass = k.get_sym_inverse33();
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse = self.impulse * data.step.dt_ratio;

            let p = Vec2::new(self.impulse.x, self.impulse.y);
            data.velocities[c.index_a].v -= p * m_a;
            data.velocities[c.index_a].w -= i_a * (self.ra.cross(p) + self.impulse.z);
            data.velocities[c.index_b].v += p * m_b;
            data.velocities[c.index_b].w += i_b * (self.rb.cross(p) + self.impulse.z);
        } else {
            self.impulse = Vec3::ZERO;
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

        if self.stiffness > 0.0 {
            let c_dot2 = w_b - w_a;
            let impulse2 = -self.mass.ez.z * (c_dot2 + self.bias + self.gamma * self.impulse.z);
            self.impulse.z += impulse2;

            w_a -= i_a * impulse2;
            w_b += i_b * impulse2;

            let c_dot1 =
                v_b + cross_scalar_vec(w_b, self.rb) - v_a - cross_scalar_vec(w_a, self.ra);
            let impulse1 = -self.mass.mul_vec2(c_dot1);
            self.impulse.x += impulse1.x;
            self.impulse.y += impulse1.y;

            v_a -= impulse1 * m_a;
            w_a -= i_a * self.ra.cross(impulse1);
            v_b += impulse1 * m_b;
            w_b += i_b * self.rb.cross(impulse1);
        } else {
            let c_dot1 =
                v_b + cross_scalar_vec(w_b, self.rb) - v_a - cross_scalar_vec(w_a, self.ra);
            let c_dot2 = w_b - w_a;
            let c_dot = Vec3::new(c_dot1.x, c_dot1.y, c_dot2);

            let impulse = -self.mass.mul_vec3(c_dot);
            self.impulse = self.impulse + impulse;

            let p = Vec2::new(impulse.x, impulse.y);
            v_a -= p * m_a;
            w_a -= i_a * (self.ra.cross(p) + impulse.z);
            v_b += p * m_b;
            w_b += i_b * (self.rb.cross(p) + impulse.z);
        }

        data.velocities[c.index_a].v = v_a;
        data.velocities[c.index_a].w = w_a;
        data.velocities[c.index_b].v = v_b;
        data.velocities[c.index_b].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let c = self.cache;
        let m_a = c.inv_mass_a;
        let m_b = c.inv_mass_b;
        let i_a = c.inv_i_a;
        let i_b = c.inv_i_b;

        let mut c_a = data.positions[c.index_a].c;
        let mut a_a = data.positions[c.index_a].a;
        let mut c_b = data.positions[c.index_b].c;
        let mut a_b = data.positions[c.index_b].a;

        let q_a = Rot::from_radians(a_a);
        let q_b = Rot::from_radians(a_b);

        let ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
        let rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);

        let mut k = Mat33::default();
        k.ex.x = m_a + m_b + ra.y * ra.y * i_a + rb.y * rb.y * i_b;
        k.ey.x = -ra.y * ra.x * i_a - rb.y * rb.x * i_b;
        k.ez.x = -ra.y * i_a - rb.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + ra.x * ra.x * i_a + rb.x * rb.x * i_b;
        k.ez.y = ra.x * i_a + rb.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;

        let position_error;
        let angular_error;

        if self.stiffness > 0.0 {
            let c1 = c_b + rb - c_a - ra;
            position_error = c1.length();
            angular_error = 0.0;

            let p = -k.solve22(c1);

            c_a -= p * m_a;
            a_a -= i_a * ra.cross(p);
            c_b += p * m_b;
            a_b += i_b * rb.cross(p);
        } else {
            let c1 = c_b + rb - c_a - ra;
            let c2 = a_b - a_a - self.reference_angle;

            position_error = c1.length();
            angular_error = c2.abs();

            let error = Vec3::new(c1.x, c1.y, c2);
            let impulse = if k.ez.z > 0.0 {
                -k.solve33(error)
            } else {
                let impulse2 = -k.solve22(c1);
                Vec3::new(impulse2.x, impulse2.y, 0.0)
            };

            let p = Vec2::new(impulse.x, impulse.y);
            c_a -= p * m_a;
            a_a -= i_a * (ra.cross(p) + impulse.z);
            c_b += p * m_b;
            a_b += i_b * (rb.cross(p) + impulse.z);
        }

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;

        position_error <= tuning::LINEAR_SLOP && angular_error <= tuning::ANGULAR_SLOP
    }
}
