//! Pulley joint: an ideal rope over two ground pulleys,
//! `length_a + ratio * length_b = constant`.

use slab::Slab;

use crate::body::Body;
use crate::core::math::Rot;
use crate::joints::{JointBase, JointError, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{cross_scalar_vec, Vec2};

/// Pulley joint definition. Anchors and ground anchors are captured in world
/// coordinates at creation time.
#[derive(Clone, Debug)]
pub struct PulleyJointDef {
    pub base: JointBase,
    pub ground_anchor_a: Vec2,
    pub ground_anchor_b: Vec2,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub length_a: f32,
    pub length_b: f32,
    pub ratio: f32,
}

impl PulleyJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            ground_anchor_a: Vec2::new(-1.0, 1.0),
            ground_anchor_b: Vec2::new(1.0, 1.0),
            local_anchor_a: Vec2::new(-1.0, 0.0),
            local_anchor_b: Vec2::new(1.0, 0.0),
            length_a: 0.0,
            length_b: 0.0,
            ratio: 1.0,
        }
    }

    /// Configure from world-space ground anchors and body anchors; rest
    /// lengths are measured from the current pose.
    pub fn world_anchors<GA, GB, VA, VB>(
        mut self,
        bodies: &Slab<Body>,
        ground_a: GA,
        ground_b: GB,
        anchor_a: VA,
        anchor_b: VB,
        ratio: f32,
    ) -> Result<Self, JointError>
    where
        GA: Into<Vec2>,
        GB: Into<Vec2>,
        VA: Into<Vec2>,
        VB: Into<Vec2>,
    {
        if ratio == 0.0 || ratio.abs() < f32::EPSILON {
            return Err(JointError::ZeroRatio);
        }
        let ground_a = ground_a.into();
        let ground_b = ground_b.into();
        let anchor_a = anchor_a.into();
        let anchor_b = anchor_b.into();

        self.ground_anchor_a = ground_a;
        self.ground_anchor_b = ground_b;
        self.local_anchor_a = bodies[self.base.body_a.0].local_point(anchor_a);
        self.local_anchor_b = bodies[self.base.body_b.0].local_point(anchor_b);
        self.length_a = (anchor_a - ground_a).length();
        self.length_b = (anchor_b - ground_b).length();
        self.ratio = ratio;
        Ok(self)
    }
}

#[derive(Clone, Debug)]
pub struct PulleyJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    ground_anchor_a: Vec2,
    ground_anchor_b: Vec2,
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    constant: f32,
    ratio: f32,

    impulse: f32,

    cache: JointSolverCache,
    u_a: Vec2,
    u_b: Vec2,
    ra: Vec2,
    rb: Vec2,
    mass: f32,
}

impl PulleyJoint {
    pub(crate) fn new(def: &PulleyJointDef) -> Self {
        debug_assert!(def.ratio != 0.0);
        Self {
            base: def.base,
            island_flag: false,
            ground_anchor_a: def.ground_anchor_a,
            ground_anchor_b: def.ground_anchor_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            constant: def.length_a + def.ratio * def.length_b,
            ratio: def.ratio,
            impulse: 0.0,
            cache: JointSolverCache::default(),
            u_a: Vec2::ZERO,
            u_b: Vec2::ZERO,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            mass: 0.0,
        }
    }

    pub fn ground_anchor_a(&self) -> Vec2 {
        self.ground_anchor_a
    }

    pub fn ground_anchor_b(&self) -> Vec2 {
        self.ground_anchor_b
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn current_length_a(&self, bodies: &Slab<Body>) -> f32 {
        (self.anchor_a(bodies) - self.ground_anchor_a).length()
    }

    pub fn current_length_b(&self, bodies: &Slab<Body>) -> f32 {
        (self.anchor_b(bodies) - self.ground_anchor_b).length()
    }

    pub(crate) fn shift_origin(&mut self, new_origin: Vec2) {
        self.ground_anchor_a -= new_origin;
        self.ground_anchor_b -= new_origin;
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].world_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u_b * (self.impulse * inv_dt)
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

        // Rope directions from the ground anchors.
        self.u_a = c_a + self.ra - self.ground_anchor_a;
        self.u_b = c_b + self.rb - self.ground_anchor_b;

        let length_a = self.u_a.length();
        let length_b = self.u_b.length();

        if length_a > 10.0 * tuning::LINEAR_SLOP {
            self.u_a *= 1.0 / length_a;
        } else {
            self.u_a = Vec2::ZERO;
        }
        if length_b > 10.0 * tuning::LINEAR_SLOP {
            self.u_b *= 1.0 / length_b;
        } else {
            self.u_b = Vec2::ZERO;
        }

        let ru_a = self.ra.cross(self.u_a);
        let ru_b = self.rb.cross(self.u_b);

        let m_a = c.inv_mass_a + c.inv_i_a * ru_a * ru_a;
        let m_b = c.inv_mass_b + c.inv_i_b * ru_b * ru_b;

        self.mass = m_a + self.ratio * self.ratio * m_b;
        if self.mass > 0.0 {
            self.mass = 1.0 / self.mass;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;

            let p_a = self.u_a * (-self.impulse);
            let p_b = self.u_b * (-self.ratio * self.impulse);

            data.velocities[c.index_a].v += p_a * c.inv_mass_a;
            data.velocities[c.index_a].w += c.inv_i_a * self.ra.cross(p_a);
            data.velocities[c.index_b].v += p_b * c.inv_mass_b;
            data.velocities[c.index_b].w += c.inv_i_b * self.rb.cross(p_b);
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

        let vp_a = v_a + cross_scalar_vec(w_a, self.ra);
        let vp_b = v_b + cross_scalar_vec(w_b, self.rb);

        let c_dot = -self.u_a.dot(vp_a) - self.ratio * self.u_b.dot(vp_b);
        let impulse = -self.mass * c_dot;
        self.impulse += impulse;

        let p_a = self.u_a * (-impulse);
        let p_b = self.u_b * (-self.ratio * impulse);
        v_a += p_a * c.inv_mass_a;
        w_a += c.inv_i_a * self.ra.cross(p_a);
        v_b += p_b * c.inv_mass_b;
        w_b += c.inv_i_b * self.rb.cross(p_b);

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

        let mut u_a = c_a + ra - self.ground_anchor_a;
        let mut u_b = c_b + rb - self.ground_anchor_b;

        let length_a = u_a.length();
        let length_b = u_b.length();

        if length_a > 10.0 * tuning::LINEAR_SLOP {
            u_a *= 1.0 / length_a;
        } else {
            u_a = Vec2::ZERO;
        }
        if length_b > 10.0 * tuning::LINEAR_SLOP {
            u_b *= 1.0 / length_b;
        } else {
            u_b = Vec2::ZERO;
        }

        let ru_a = ra.cross(u_a);
        let ru_b = rb.cross(u_b);

        let m_a = c.inv_mass_a + c.inv_i_a * ru_a * ru_a;
        let m_b = c.inv_mass_b + c.inv_i_b * ru_b * ru_b;

        let mut mass = m_a + self.ratio * self.ratio * m_b;
        if mass > 0.0 {
            mass = 1.0 / mass;
        }

        let error = self.constant - length_a - self.ratio * length_b;
        let linear_error = error.abs();

        let impulse = -mass * error;

        let p_a = u_a * (-impulse);
        let p_b = u_b * (-self.ratio * impulse);

        c_a += p_a * c.inv_mass_a;
        a_a += c.inv_i_a * ra.cross(p_a);
        c_b += p_b * c.inv_mass_b;
        a_b += c.inv_i_b * rb.cross(p_b);

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;

        linear_error < tuning::LINEAR_SLOP
    }
}
