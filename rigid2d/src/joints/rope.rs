//! Rope joint: a one-sided maximum-distance constraint between two anchors.
//! Slack below the maximum length, rigid at it.

use slab::Slab;

use crate::body::Body;
use crate::core::math::Rot;
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{cross_scalar_vec, Vec2};

/// Rope joint definition.
#[derive(Clone, Debug)]
pub struct RopeJointDef {
    pub base: JointBase,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub max_length: f32,
}

impl RopeJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            local_anchor_a: Vec2::new(-1.0, 0.0),
            local_anchor_b: Vec2::new(1.0, 0.0),
            max_length: 0.0,
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

    pub fn max_length(mut self, v: f32) -> Self {
        self.max_length = v;
        self
    }

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
        self.max_length = (b - a).length();
        self
    }
}

#[derive(Clone, Debug)]
pub struct RopeJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    max_length: f32,

    impulse: f32,

    cache: JointSolverCache,
    u: Vec2,
    ra: Vec2,
    rb: Vec2,
    length: f32,
    mass: f32,
}

impl RopeJoint {
    pub(crate) fn new(def: &RopeJointDef) -> Self {
        Self {
            base: def.base,
            island_flag: false,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_length: def.max_length,
            impulse: 0.0,
            cache: JointSolverCache::default(),
            u: Vec2::ZERO,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            length: 0.0,
            mass: 0.0,
        }
    }

    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    pub fn set_max_length(&mut self, v: f32) {
        self.max_length = v;
    }

    /// Current anchor separation.
    pub fn current_length(&self) -> f32 {
        self.length
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].world_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u * (self.impulse * inv_dt)
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

        self.length = self.u.normalize();

        if self.length <= tuning::LINEAR_SLOP {
            self.u = Vec2::ZERO;
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = self.ra.cross(self.u);
        let cr_b = self.rb.cross(self.u);
        let inv_mass =
            c.inv_mass_a + c.inv_i_a * cr_a * cr_a + c.inv_mass_b + c.inv_i_b * cr_b * cr_b;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;

            let p = self.u * self.impulse;
            data.velocities[c.index_a].v -= p * c.inv_mass_a;
            data.velocities[c.index_a].w -= c.inv_i_a * self.ra.cross(p);
            data.velocities[c.index_b].v += p * c.inv_mass_b;
            data.velocities[c.index_b].w += c.inv_i_b * self.rb.cross(p);
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let c = self.cache;
        let mut v_a = data.velocities[c.index_a].v;
        let mut w_a = data.velocities[c.index_a].w;
        let mut v_b = data.velocities[c.index_b].v;
        let mut w_b = data.velocities[c.index_b].w;

        // Predictive speculation keeps the rope from overshooting.
        let vp_a = v_a + cross_scalar_vec(w_a, self.ra);
        let vp_b = v_b + cross_scalar_vec(w_b, self.rb);
        let error = self.length - self.max_length;
        let mut c_dot = self.u.dot(vp_b - vp_a);

        if error < 0.0 {
            c_dot += data.step.inv_dt * error;
        }

        let mut impulse = -self.mass * c_dot;
        let old_impulse = self.impulse;
        self.impulse = (self.impulse + impulse).min(0.0);
        impulse = self.impulse - old_impulse;

        let p = self.u * impulse;
        v_a -= p * c.inv_mass_a;
        w_a -= c.inv_i_a * self.ra.cross(p);
        v_b += p * c.inv_mass_b;
        w_b += c.inv_i_b * self.rb.cross(p);

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
        let error = (length - self.max_length).clamp(0.0, tuning::MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * error;
        let p = u * impulse;

        c_a -= p * c.inv_mass_a;
        a_a -= c.inv_i_a * ra.cross(p);
        c_b += p * c.inv_mass_b;
        a_b += c.inv_i_b * rb.cross(p);

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;

        length - self.max_length < tuning::LINEAR_SLOP
    }
}
