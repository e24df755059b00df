//! Mouse (target) joint: a soft spring pulling a point on a body toward a
//! world target, typically driven by a cursor. Body A is unused beyond
//! anchoring the joint in the graph.

use slab::Slab;

use crate::body::Body;
use crate::core::math::{Mat22, Rot};
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::types::{cross_scalar_vec, Vec2};

/// Mouse joint definition.
#[derive(Clone, Debug)]
pub struct MouseJointDef {
    pub base: JointBase,
    pub target: Vec2,
    pub max_force: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl MouseJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            target: Vec2::ZERO,
            max_force: 0.0,
            stiffness: 0.0,
            damping: 0.0,
        }
    }

    /// Initial world target; the body anchor is the point of the body under
    /// the target at creation time.
    pub fn target<V: Into<Vec2>>(mut self, v: V) -> Self {
        self.target = v.into();
        self
    }

    /// Force cap, usually scaled with the body weight.
    pub fn max_force(mut self, v: f32) -> Self {
        self.max_force = v;
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
}

#[derive(Clone, Debug)]
pub struct MouseJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    target: Vec2,
    local_anchor_b: Vec2,
    max_force: f32,
    stiffness: f32,
    damping: f32,

    impulse: Vec2,

    cache: JointSolverCache,
    rb: Vec2,
    mass: Mat22,
    c_error: Vec2,
    gamma: f32,
    beta: f32,
}

impl MouseJoint {
    pub(crate) fn new(def: &MouseJointDef, bodies: &Slab<Body>) -> Self {
        debug_assert!(def.target.is_valid());
        Self {
            base: def.base,
            island_flag: false,
            target: def.target,
            local_anchor_b: bodies[def.base.body_b.0].local_point(def.target),
            max_force: def.max_force,
            stiffness: def.stiffness,
            damping: def.damping,
            impulse: Vec2::ZERO,
            cache: JointSolverCache::default(),
            rb: Vec2::ZERO,
            mass: Mat22::default(),
            c_error: Vec2::ZERO,
            gamma: 0.0,
            beta: 0.0,
        }
    }

    /// Move the tracked world point. Use `World::set_mouse_target` so the
    /// body is also woken.
    pub fn set_target<V: Into<Vec2>>(&mut self, target: V) {
        self.target = target.into();
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn set_max_force(&mut self, v: f32) {
        self.max_force = v;
    }

    pub fn set_stiffness(&mut self, v: f32) {
        self.stiffness = v;
    }

    pub fn set_damping(&mut self, v: f32) {
        self.damping = v;
    }

    pub(crate) fn shift_origin(&mut self, new_origin: Vec2) {
        self.target -= new_origin;
    }

    pub fn anchor_a(&self, _bodies: &Slab<Body>) -> Vec2 {
        self.target
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.impulse * inv_dt
    }

    pub fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }

    pub(crate) fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &Slab<Body>) {
        self.cache = JointSolverCache::gather(&self.base, bodies);
        let c = self.cache;

        let c_b = data.positions[c.index_b].c;
        let a_b = data.positions[c.index_b].a;
        let q_b = Rot::from_radians(a_b);

        let d = self.damping;
        let k = self.stiffness;
        let h = data.step.dt;

        self.gamma = h * (d + h * k);
        if self.gamma != 0.0 {
            self.gamma = 1.0 / self.gamma;
        }
        self.beta = h * k * self.gamma;

        self.rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);

        // K = invMass * I + invI * [rb.y^2 -rb.x*rb.y; -rb.x*rb.y rb.x^2]
        //   + gamma * I
        let i_b = c.inv_i_b;
        let m_b = c.inv_mass_b;
        let k_matrix = Mat22::new(
            Vec2::new(
                m_b + i_b * self.rb.y * self.rb.y + self.gamma,
                -i_b * self.rb.x * self.rb.y,
            ),
            Vec2::new(
                -i_b * self.rb.x * self.rb.y,
                m_b + i_b * self.rb.x * self.rb.x + self.gamma,
            ),
        );
        self.mass = k_matrix.inverse();

        self.c_error = (c_b + self.rb - self.target) * self.beta;

        // A slight damping helps the target track smoothly.
        data.velocities[c.index_b].w *= 0.98;

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            data.velocities[c.index_b].v += self.impulse * m_b;
            data.velocities[c.index_b].w += i_b * self.rb.cross(self.impulse);
        } else {
            self.impulse = Vec2::ZERO;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let c = self.cache;
        let mut v_b = data.velocities[c.index_b].v;
        let mut w_b = data.velocities[c.index_b].w;

        let c_dot = v_b + cross_scalar_vec(w_b, self.rb);
        let mut impulse = self
            .mass
            .mul_vec(-(c_dot + self.c_error + self.impulse * self.gamma));

        let old_impulse = self.impulse;
        self.impulse += impulse;
        let max_impulse = data.step.dt * self.max_force;
        if self.impulse.length_squared() > max_impulse * max_impulse {
            self.impulse = self.impulse.normalized() * max_impulse;
        }
        impulse = self.impulse - old_impulse;

        v_b += impulse * c.inv_mass_b;
        w_b += c.inv_i_b * self.rb.cross(impulse);

        data.velocities[c.index_b].v = v_b;
        data.velocities[c.index_b].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, _data: &mut SolverData) -> bool {
        true
    }
}
