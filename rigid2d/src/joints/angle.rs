//! Angle joint: drives the relative angle of two bodies toward a target,
//! with a bias factor and softness instead of a rigid lock.

use slab::Slab;

use crate::body::Body;
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::Vec2;

/// Angle joint definition.
#[derive(Clone, Debug)]
pub struct AngleJointDef {
    pub base: JointBase,
    pub target_angle: f32,
    /// Fraction of the angular error fed back per step, in (0, 1].
    pub bias_factor: f32,
    /// Constraint softness; zero is rigid.
    pub softness: f32,
    pub max_impulse: f32,
}

impl AngleJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            target_angle: 0.0,
            bias_factor: 0.2,
            softness: 0.0,
            max_impulse: f32::MAX,
        }
    }

    pub fn target_angle(mut self, v: f32) -> Self {
        self.target_angle = v;
        self
    }

    pub fn bias_factor(mut self, v: f32) -> Self {
        self.bias_factor = v;
        self
    }

    pub fn softness(mut self, v: f32) -> Self {
        self.softness = v;
        self
    }

    pub fn max_impulse(mut self, v: f32) -> Self {
        self.max_impulse = v;
        self
    }
}

#[derive(Clone, Debug)]
pub struct AngleJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    target_angle: f32,
    bias_factor: f32,
    softness: f32,
    max_impulse: f32,

    accumulated_impulse: f32,

    cache: JointSolverCache,
    bias: f32,
    joint_error: f32,
    mass_factor: f32,
}

impl AngleJoint {
    pub(crate) fn new(def: &AngleJointDef) -> Self {
        Self {
            base: def.base,
            island_flag: false,
            target_angle: def.target_angle,
            bias_factor: def.bias_factor,
            softness: def.softness,
            max_impulse: def.max_impulse,
            accumulated_impulse: 0.0,
            cache: JointSolverCache::default(),
            bias: 0.0,
            joint_error: 0.0,
            mass_factor: 0.0,
        }
    }

    pub fn target_angle(&self) -> f32 {
        self.target_angle
    }

    pub fn set_target_angle(&mut self, v: f32) {
        self.target_angle = v;
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].position()
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].position()
    }

    pub fn reaction_force(&self, _inv_dt: f32) -> Vec2 {
        Vec2::ZERO
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.accumulated_impulse * inv_dt
    }

    pub(crate) fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &Slab<Body>) {
        self.cache = JointSolverCache::gather(&self.base, bodies);
        let c = self.cache;

        let a_a = data.positions[c.index_a].a;
        let a_b = data.positions[c.index_b].a;

        self.joint_error = a_b - a_a - self.target_angle;
        self.bias = -self.bias_factor * data.step.inv_dt * self.joint_error;

        let inv_i = c.inv_i_a + c.inv_i_b;
        self.mass_factor = if inv_i != 0.0 {
            (1.0 - self.softness) / inv_i
        } else {
            0.0
        };

        if data.step.warm_starting {
            self.accumulated_impulse *= data.step.dt_ratio;
            data.velocities[c.index_a].w -= c.inv_i_a * self.accumulated_impulse;
            data.velocities[c.index_b].w += c.inv_i_b * self.accumulated_impulse;
        } else {
            self.accumulated_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let c = self.cache;
        let w_a = data.velocities[c.index_a].w;
        let w_b = data.velocities[c.index_b].w;

        let mut impulse = (self.bias - w_b + w_a) * self.mass_factor;

        // Accumulated clamping against the impulse cap.
        let old_impulse = self.accumulated_impulse;
        self.accumulated_impulse =
            (old_impulse + impulse).clamp(-self.max_impulse, self.max_impulse);
        impulse = self.accumulated_impulse - old_impulse;

        data.velocities[c.index_a].w = w_a - c.inv_i_a * impulse;
        data.velocities[c.index_b].w = w_b + c.inv_i_b * impulse;
    }

    pub(crate) fn solve_position_constraints(&mut self, _data: &mut SolverData) -> bool {
        // The bias term absorbs the position error.
        self.joint_error.abs() <= 3.0 * tuning::ANGULAR_SLOP
    }
}
