//! Gear joint: couples the coordinates of two revolute/prismatic joints so
//! `coordinate_a + ratio * coordinate_b` stays constant. Can model rack and
//! pinion as well as gear trains.

use slab::Slab;

use crate::body::Body;
use crate::core::math::Rot;
use crate::joints::{Joint, JointBase, JointError, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{BodyId, JointId, Vec2};

/// Gear joint definition. The referenced joints must be revolute or
/// prismatic, each attached to a ground body as body A.
#[derive(Clone, Debug)]
pub struct GearJointDef {
    pub base: JointBase,
    pub joint1: JointId,
    pub joint2: JointId,
    pub ratio: f32,
}

impl GearJointDef {
    pub fn new(base: JointBase, joint1: JointId, joint2: JointId, ratio: f32) -> Self {
        Self {
            base,
            joint1,
            joint2,
            ratio,
        }
    }
}

/// The geometry extracted from one referenced joint at creation time.
#[derive(Copy, Clone, Debug)]
enum GearHalf {
    Revolute {
        reference_angle: f32,
    },
    Prismatic {
        local_anchor_ground: Vec2,
        local_anchor_body: Vec2,
        local_axis_ground: Vec2,
    },
}

#[derive(Copy, Clone, Debug, Default)]
struct GearCache {
    index_c: usize,
    index_d: usize,
    local_center_c: Vec2,
    local_center_d: Vec2,
    inv_mass_c: f32,
    inv_mass_d: f32,
    inv_i_c: f32,
    inv_i_d: f32,
}

#[derive(Clone, Debug)]
pub struct GearJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    joint1: JointId,
    joint2: JointId,
    // Ground bodies of the referenced joints.
    body_c: BodyId,
    body_d: BodyId,
    half_a: GearHalf,
    half_b: GearHalf,
    ratio: f32,
    constant: f32,

    impulse: f32,

    cache: JointSolverCache,
    gear_cache: GearCache,
    jv_ac: Vec2,
    jv_bd: Vec2,
    jw_a: f32,
    jw_b: f32,
    jw_c: f32,
    jw_d: f32,
    mass: f32,
}

fn extract_half(joint: &Joint) -> Result<GearHalf, JointError> {
    match joint {
        Joint::Revolute(j) => Ok(GearHalf::Revolute {
            reference_angle: j.reference_angle(),
        }),
        Joint::Prismatic(j) => Ok(GearHalf::Prismatic {
            local_anchor_ground: j.local_anchor_a(),
            local_anchor_body: j.local_anchor_b(),
            local_axis_ground: j.local_axis_a(),
        }),
        _ => Err(JointError::BadGearReference),
    }
}

impl GearJoint {
    /// Build the gear from the referenced joints' current geometry. Requires
    /// a non-zero ratio and revolute/prismatic references.
    pub(crate) fn new(
        def: &GearJointDef,
        joints: &Slab<Joint>,
        bodies: &Slab<Body>,
    ) -> Result<Self, JointError> {
        if def.ratio == 0.0 {
            return Err(JointError::ZeroRatio);
        }

        let joint1 = &joints[def.joint1.0];
        let joint2 = &joints[def.joint2.0];
        let half_a = extract_half(joint1)?;
        let half_b = extract_half(joint2)?;

        let body_c = joint1.body_a();
        let body_a = joint1.body_b();
        let body_d = joint2.body_a();
        let body_b = joint2.body_b();

        let coordinate_a = Self::coordinate(&half_a, &bodies[body_c.0], &bodies[body_a.0]);
        let coordinate_b = Self::coordinate(&half_b, &bodies[body_d.0], &bodies[body_b.0]);

        let mut base = def.base;
        base.body_a = body_a;
        base.body_b = body_b;

        Ok(Self {
            base,
            island_flag: false,
            joint1: def.joint1,
            joint2: def.joint2,
            body_c,
            body_d,
            half_a,
            half_b,
            ratio: def.ratio,
            constant: coordinate_a + def.ratio * coordinate_b,
            impulse: 0.0,
            cache: JointSolverCache::default(),
            gear_cache: GearCache::default(),
            jv_ac: Vec2::ZERO,
            jv_bd: Vec2::ZERO,
            jw_a: 0.0,
            jw_b: 0.0,
            jw_c: 0.0,
            jw_d: 0.0,
            mass: 0.0,
        })
    }

    fn coordinate(half: &GearHalf, ground: &Body, body: &Body) -> f32 {
        match half {
            GearHalf::Revolute { reference_angle } => {
                body.sweep.a - ground.sweep.a - reference_angle
            }
            GearHalf::Prismatic {
                local_anchor_ground,
                local_anchor_body,
                local_axis_ground,
            } => {
                let p_ground = *local_anchor_ground;
                let anchor_world = body.world_point(*local_anchor_body);
                let p_body = ground.local_point(anchor_world);
                (p_body - p_ground).dot(*local_axis_ground)
            }
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        debug_assert!(ratio != 0.0);
        self.ratio = ratio;
    }

    pub fn joint1(&self) -> JointId {
        self.joint1
    }

    pub fn joint2(&self) -> JointId {
        self.joint2
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        match &self.half_a {
            GearHalf::Revolute { .. } => bodies[self.base.body_a.0].position(),
            GearHalf::Prismatic {
                local_anchor_body, ..
            } => bodies[self.base.body_a.0].world_point(*local_anchor_body),
        }
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        match &self.half_b {
            GearHalf::Revolute { .. } => bodies[self.base.body_b.0].position(),
            GearHalf::Prismatic {
                local_anchor_body, ..
            } => bodies[self.base.body_b.0].world_point(*local_anchor_body),
        }
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.jv_ac * (self.impulse * inv_dt)
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.impulse * self.jw_a * inv_dt
    }

    pub(crate) fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &Slab<Body>) {
        self.cache = JointSolverCache::gather(&self.base, bodies);
        let body_c = &bodies[self.body_c.0];
        let body_d = &bodies[self.body_d.0];
        self.gear_cache = GearCache {
            index_c: body_c.island_index,
            index_d: body_d.island_index,
            local_center_c: body_c.sweep.local_center,
            local_center_d: body_d.sweep.local_center,
            inv_mass_c: body_c.inv_mass,
            inv_mass_d: body_d.inv_mass,
            inv_i_c: body_c.inv_inertia,
            inv_i_d: body_d.inv_inertia,
        };

        let c = self.cache;
        let g = self.gear_cache;

        let a_a = data.positions[c.index_a].a;
        let a_b = data.positions[c.index_b].a;
        let a_c = data.positions[g.index_c].a;
        let a_d = data.positions[g.index_d].a;

        let q_a = Rot::from_radians(a_a);
        let q_b = Rot::from_radians(a_b);
        let q_c = Rot::from_radians(a_c);
        let q_d = Rot::from_radians(a_d);

        self.mass = 0.0;

        match &self.half_a {
            GearHalf::Revolute { .. } => {
                self.jv_ac = Vec2::ZERO;
                self.jw_a = 1.0;
                self.jw_c = 1.0;
                self.mass += c.inv_i_a + g.inv_i_c;
            }
            GearHalf::Prismatic {
                local_anchor_ground,
                local_anchor_body,
                local_axis_ground,
            } => {
                let u = q_c.rotate_vec(*local_axis_ground);
                let rc = q_c.rotate_vec(*local_anchor_ground - g.local_center_c);
                let ra = q_a.rotate_vec(*local_anchor_body - c.local_center_a);
                self.jv_ac = u;
                self.jw_c = rc.cross(u);
                self.jw_a = ra.cross(u);
                self.mass += g.inv_mass_c
                    + c.inv_mass_a
                    + g.inv_i_c * self.jw_c * self.jw_c
                    + c.inv_i_a * self.jw_a * self.jw_a;
            }
        }

        match &self.half_b {
            GearHalf::Revolute { .. } => {
                self.jv_bd = Vec2::ZERO;
                self.jw_b = self.ratio;
                self.jw_d = self.ratio;
                self.mass += self.ratio * self.ratio * (c.inv_i_b + g.inv_i_d);
            }
            GearHalf::Prismatic {
                local_anchor_ground,
                local_anchor_body,
                local_axis_ground,
            } => {
                let u = q_d.rotate_vec(*local_axis_ground);
                let rd = q_d.rotate_vec(*local_anchor_ground - g.local_center_d);
                let rb = q_b.rotate_vec(*local_anchor_body - c.local_center_b);
                self.jv_bd = u * self.ratio;
                self.jw_d = self.ratio * rd.cross(u);
                self.jw_b = self.ratio * rb.cross(u);
                self.mass += self.ratio * self.ratio * (g.inv_mass_d + c.inv_mass_b)
                    + g.inv_i_d * self.jw_d * self.jw_d
                    + c.inv_i_b * self.jw_b * self.jw_b;
            }
        }

        self.mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };

        if data.step.warm_starting {
            data.velocities[c.index_a].v += self.jv_ac * (c.inv_mass_a * self.impulse);
            data.velocities[c.index_a].w += c.inv_i_a * self.impulse * self.jw_a;
            data.velocities[c.index_b].v += self.jv_bd * (c.inv_mass_b * self.impulse);
            data.velocities[c.index_b].w += c.inv_i_b * self.impulse * self.jw_b;
            data.velocities[g.index_c].v -= self.jv_ac * (g.inv_mass_c * self.impulse);
            data.velocities[g.index_c].w -= g.inv_i_c * self.impulse * self.jw_c;
            data.velocities[g.index_d].v -= self.jv_bd * (g.inv_mass_d * self.impulse);
            data.velocities[g.index_d].w -= g.inv_i_d * self.impulse * self.jw_d;
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let c = self.cache;
        let g = self.gear_cache;

        let v_a = data.velocities[c.index_a].v;
        let w_a = data.velocities[c.index_a].w;
        let v_b = data.velocities[c.index_b].v;
        let w_b = data.velocities[c.index_b].w;
        let v_c = data.velocities[g.index_c].v;
        let w_c = data.velocities[g.index_c].w;
        let v_d = data.velocities[g.index_d].v;
        let w_d = data.velocities[g.index_d].w;

        let c_dot = self.jv_ac.dot(v_a - v_c) + self.jv_bd.dot(v_b - v_d)
            + (self.jw_a * w_a - self.jw_c * w_c)
            + (self.jw_b * w_b - self.jw_d * w_d);

        let impulse = -self.mass * c_dot;
        self.impulse += impulse;

        data.velocities[c.index_a].v = v_a + self.jv_ac * (c.inv_mass_a * impulse);
        data.velocities[c.index_a].w = w_a + c.inv_i_a * impulse * self.jw_a;
        data.velocities[c.index_b].v = v_b + self.jv_bd * (c.inv_mass_b * impulse);
        data.velocities[c.index_b].w = w_b + c.inv_i_b * impulse * self.jw_b;
        data.velocities[g.index_c].v = v_c - self.jv_ac * (g.inv_mass_c * impulse);
        data.velocities[g.index_c].w = w_c - g.inv_i_c * impulse * self.jw_c;
        data.velocities[g.index_d].v = v_d - self.jv_bd * (g.inv_mass_d * impulse);
        data.velocities[g.index_d].w = w_d - g.inv_i_d * impulse * self.jw_d;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let c = self.cache;
        let g = self.gear_cache;

        let mut c_a = data.positions[c.index_a].c;
        let mut a_a = data.positions[c.index_a].a;
        let mut c_b = data.positions[c.index_b].c;
        let mut a_b = data.positions[c.index_b].a;
        let mut c_c = data.positions[g.index_c].c;
        let mut a_c = data.positions[g.index_c].a;
        let mut c_d = data.positions[g.index_d].c;
        let mut a_d = data.positions[g.index_d].a;

        let q_a = Rot::from_radians(a_a);
        let q_b = Rot::from_radians(a_b);
        let q_c = Rot::from_radians(a_c);
        let q_d = Rot::from_radians(a_d);

        let mut mass = 0.0;

        let jv_ac;
        let jw_a;
        let jw_c;
        let coordinate_a;
        match &self.half_a {
            GearHalf::Revolute { reference_angle } => {
                jv_ac = Vec2::ZERO;
                jw_a = 1.0;
                jw_c = 1.0;
                mass += c.inv_i_a + g.inv_i_c;
                coordinate_a = a_a - a_c - reference_angle;
            }
            GearHalf::Prismatic {
                local_anchor_ground,
                local_anchor_body,
                local_axis_ground,
            } => {
                let u = q_c.rotate_vec(*local_axis_ground);
                let rc = q_c.rotate_vec(*local_anchor_ground - g.local_center_c);
                let ra = q_a.rotate_vec(*local_anchor_body - c.local_center_a);
                jv_ac = u;
                jw_c = rc.cross(u);
                jw_a = ra.cross(u);
                mass += g.inv_mass_c + c.inv_mass_a + g.inv_i_c * jw_c * jw_c
                    + c.inv_i_a * jw_a * jw_a;

                let p_c = *local_anchor_ground - g.local_center_c;
                let p_a = q_c.inv_rotate_vec(ra + (c_a - c_c));
                coordinate_a = (p_a - p_c).dot(*local_axis_ground);
            }
        }

        let jv_bd;
        let jw_b;
        let jw_d;
        let coordinate_b;
        match &self.half_b {
            GearHalf::Revolute { reference_angle } => {
                jv_bd = Vec2::ZERO;
                jw_b = self.ratio;
                jw_d = self.ratio;
                mass += self.ratio * self.ratio * (c.inv_i_b + g.inv_i_d);
                coordinate_b = a_b - a_d - reference_angle;
            }
            GearHalf::Prismatic {
                local_anchor_ground,
                local_anchor_body,
                local_axis_ground,
            } => {
                let u = q_d.rotate_vec(*local_axis_ground);
                let rd = q_d.rotate_vec(*local_anchor_ground - g.local_center_d);
                let rb = q_b.rotate_vec(*local_anchor_body - c.local_center_b);
                jv_bd = u * self.ratio;
                jw_d = self.ratio * rd.cross(u);
                jw_b = self.ratio * rb.cross(u);
                mass += self.ratio * self.ratio * (g.inv_mass_d + c.inv_mass_b)
                    + g.inv_i_d * jw_d * jw_d
                    + c.inv_i_b * jw_b * jw_b;

                let p_d = *local_anchor_ground - g.local_center_d;
                let p_b = q_d.inv_rotate_vec(rb + (c_b - c_d));
                coordinate_b = (p_b - p_d).dot(*local_axis_ground);
            }
        }

        let error = coordinate_a + self.ratio * coordinate_b - self.constant;

        let impulse = if mass > 0.0 { -error / mass } else { 0.0 };

        c_a += jv_ac * (c.inv_mass_a * impulse);
        a_a += c.inv_i_a * impulse * jw_a;
        c_b += jv_bd * (c.inv_mass_b * impulse);
        a_b += c.inv_i_b * impulse * jw_b;
        c_c -= jv_ac * (g.inv_mass_c * impulse);
        a_c -= g.inv_i_c * impulse * jw_c;
        c_d -= jv_bd * (g.inv_mass_d * impulse);
        a_d -= g.inv_i_d * impulse * jw_d;

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;
        data.positions[g.index_c].c = c_c;
        data.positions[g.index_c].a = a_c;
        data.positions[g.index_d].c = c_d;
        data.positions[g.index_d].a = a_d;

        error.abs() < tuning::LINEAR_SLOP
    }
}
