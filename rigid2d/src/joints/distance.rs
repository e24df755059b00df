//! Distance joint: keeps the distance between two anchor points at a rest
//! length, optionally as a soft spring and optionally limited to a range.

use slab::Slab;

use crate::body::Body;
use crate::core::math::Rot;
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{cross_scalar_vec, Vec2};

/// Distance joint definition.
///
/// With zero stiffness the joint is rigid at `length`. With positive
/// stiffness it behaves as a spring-damper between `min_length` and
/// `max_length`, which stay hard limits.
#[derive(Clone, Debug)]
pub struct DistanceJointDef {
    pub base: JointBase,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub length: f32,
    pub min_length: f32,
    pub max_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl DistanceJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length: 1.0,
            min_length: 1.0,
            max_length: 1.0,
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

    /// Rest length; also resets the limits to it.
    pub fn length(mut self, v: f32) -> Self {
        let v = v.max(tuning::LINEAR_SLOP);
        self.length = v;
        self.min_length = v;
        self.max_length = v;
        self
    }

    pub fn min_length(mut self, v: f32) -> Self {
        self.min_length = v.max(tuning::LINEAR_SLOP);
        self
    }

    pub fn max_length(mut self, v: f32) -> Self {
        self.max_length = v.max(tuning::LINEAR_SLOP);
        self
    }

    /// Spring stiffness in N/m; zero keeps the joint rigid.
    pub fn stiffness(mut self, v: f32) -> Self {
        self.stiffness = v;
        self
    }

    /// Spring damping in N*s/m.
    pub fn damping(mut self, v: f32) -> Self {
        self.damping = v;
        self
    }

    /// Derive anchors and rest length from two world points.
    pub fn world_anchors<VA: Into<Vec2>, VB: Into<Vec2>>(
        mut self,
        bodies: &Slab<Body>,
        anchor_a: VA,
        anchor_b: VB,
    ) -> Self {
        let a = anchor_a.into();
        let b = anchor_b.into();
        self.local_anchor_a = bodies[self.base.body_a.0].local_point(a);
        self.local_anchor_b = bodies[self.base.body_b.0].local_point(b);
        self.length((b - a).length())
    }
}

#[derive(Clone, Debug)]
pub struct DistanceJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    length: f32,
    min_length: f32,
    max_length: f32,
    stiffness: f32,
    damping: f32,

    // Solver state
    impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,
    cache: JointSolverCache,
    u: Vec2,
    ra: Vec2,
    rb: Vec2,
    current_length: f32,
    soft_mass: f32,
    axial_mass: f32,
    gamma: f32,
    bias: f32,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Self {
        debug_assert!(def.min_length <= def.max_length);
        Self {
            base: def.base,
            island_flag: false,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length.max(tuning::LINEAR_SLOP),
            min_length: def.min_length,
            max_length: def.max_length,
            stiffness: def.stiffness,
            damping: def.damping,
            impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            cache: JointSolverCache::default(),
            u: Vec2::ZERO,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            current_length: 0.0,
            soft_mass: 0.0,
            axial_mass: 0.0,
            gamma: 0.0,
            bias: 0.0,
        }
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, length: f32) {
        self.impulse = 0.0;
        self.length = length.max(tuning::LINEAR_SLOP);
    }

    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    pub fn set_stiffness(&mut self, v: f32) {
        self.stiffness = v;
    }

    pub fn damping(&self) -> f32 {
        self.damping
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
        self.u * ((self.impulse + self.lower_impulse - self.upper_impulse) * inv_dt)
    }

    pub fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
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

        self.ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
        self.rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);
        self.u = c_b + self.rb - c_a - self.ra;

        self.current_length = self.u.normalize();
        if self.current_length <= tuning::LINEAR_SLOP {
            self.u = Vec2::ZERO;
            self.axial_mass = 0.0;
            self.impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
            return;
        }

        let cr_a = self.ra.cross(self.u);
        let cr_b = self.rb.cross(self.u);
        let mut inv_mass =
            c.inv_mass_a + c.inv_i_a * cr_a * cr_a + c.inv_mass_b + c.inv_i_b * cr_b * cr_b;
        self.axial_mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.stiffness > 0.0 && self.min_length < self.max_length {
            // Soft spring per the usual gamma/bias formulation.
            let error = self.current_length - self.length;
            let h = data.step.dt;
            self.gamma = h * (self.damping + h * self.stiffness);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = error * h * self.stiffness * self.gamma;
            inv_mass += self.gamma;
            self.soft_mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
            self.soft_mass = self.axial_mass;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            self.lower_impulse *= data.step.dt_ratio;
            self.upper_impulse *= data.step.dt_ratio;

            let p = self.u * (self.impulse + self.lower_impulse - self.upper_impulse);
            data.velocities[c.index_a].v -= p * c.inv_mass_a;
            data.velocities[c.index_a].w -= c.inv_i_a * self.ra.cross(p);
            data.velocities[c.index_b].v += p * c.inv_mass_b;
            data.velocities[c.index_b].w += c.inv_i_b * self.rb.cross(p);
        } else {
            self.impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let c = self.cache;
        let mut v_a = data.velocities[c.index_a].v;
        let mut w_a = data.velocities[c.index_a].w;
        let mut v_b = data.velocities[c.index_b].v;
        let mut w_b = data.velocities[c.index_b].w;

        if self.min_length < self.max_length {
            if self.stiffness > 0.0 {
                let vp_a = v_a + cross_scalar_vec(w_a, self.ra);
                let vp_b = v_b + cross_scalar_vec(w_b, self.rb);
                let c_dot = self.u.dot(vp_b - vp_a);

                let impulse = -self.soft_mass * (c_dot + self.bias + self.gamma * self.impulse);
                self.impulse += impulse;

                let p = self.u * impulse;
                v_a -= p * c.inv_mass_a;
                w_a -= c.inv_i_a * self.ra.cross(p);
                v_b += p * c.inv_mass_b;
                w_b += c.inv_i_b * self.rb.cross(p);
            }

            // Lower limit.
            {
                let error = self.current_length - self.min_length;
                let bias = error.min(0.0) * data.step.inv_dt;

                let vp_a = v_a + cross_scalar_vec(w_a, self.ra);
                let vp_b = v_b + cross_scalar_vec(w_b, self.rb);
                let c_dot = self.u.dot(vp_b - vp_a);

                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                impulse = self.lower_impulse - old_impulse;

                let p = self.u * impulse;
                v_a -= p * c.inv_mass_a;
                w_a -= c.inv_i_a * self.ra.cross(p);
                v_b += p * c.inv_mass_b;
                w_b += c.inv_i_b * self.rb.cross(p);
            }

            // Upper limit.
            {
                let error = self.max_length - self.current_length;
                let bias = error.min(0.0) * data.step.inv_dt;

                let vp_a = v_a + cross_scalar_vec(w_a, self.ra);
                let vp_b = v_b + cross_scalar_vec(w_b, self.rb);
                let c_dot = self.u.dot(vp_a - vp_b);

                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                impulse = self.upper_impulse - old_impulse;

                let p = self.u * (-impulse);
                v_a -= p * c.inv_mass_a;
                w_a -= c.inv_i_a * self.ra.cross(p);
                v_b += p * c.inv_mass_b;
                w_b += c.inv_i_b * self.rb.cross(p);
            }
        } else {
            // Rigid at the rest length.
            let vp_a = v_a + cross_scalar_vec(w_a, self.ra);
            let vp_b = v_b + cross_scalar_vec(w_b, self.rb);
            let c_dot = self.u.dot(vp_b - vp_a);

            let impulse = -self.axial_mass * c_dot;
            self.impulse += impulse;

            let p = self.u * impulse;
            v_a -= p * c.inv_mass_a;
            w_a -= c.inv_i_a * self.ra.cross(p);
            v_b += p * c.inv_mass_b;
            w_b += c.inv_i_b * self.rb.cross(p);
        }

        data.velocities[c.index_a].v = v_a;
        data.velocities[c.index_a].w = w_a;
        data.velocities[c.index_b].v = v_b;
        data.velocities[c.index_b].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let c = self.cache;
        let mut c_a = data.positions[c.index_a].c;
        let mut a_a = data.positions[c.index_a].a;
        let mut c_b = data.positions[c.index_b].c;
        let mut a_b = data.positions[c.index_b].a;

        let q_a = Rot::from_radians(a_a);
        let q_b = Rot::from_radians(a_b);

        let ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
        let rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);
        let mut u = c_b + rb - c_a - ra;
        let length = u.normalize();

        let error = if self.min_length == self.max_length {
            length - self.min_length
        } else if length < self.min_length {
            length - self.min_length
        } else if length > self.max_length {
            length - self.max_length
        } else if self.stiffness > 0.0 {
            // The spring owns the in-range error.
            return true;
        } else {
            length - self.length
        };

        let impulse = -self.axial_mass * error;
        let p = u * impulse;

        c_a -= p * c.inv_mass_a;
        a_a -= c.inv_i_a * ra.cross(p);
        c_b += p * c.inv_mass_b;
        a_b += c.inv_i_b * rb.cross(p);

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;

        error.abs() < tuning::LINEAR_SLOP
    }
}
