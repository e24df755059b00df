//! Prismatic joint: restricts relative motion to translation along one axis,
//! with an optional translation limit and motor.

use slab::Slab;

use crate::body::Body;
use crate::core::math::{Mat22, Mat33, Rot, Vec3};
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{cross_scalar_vec, Vec2};

/// Prismatic joint definition. The axis is expressed in body A's frame.
#[derive(Clone, Debug)]
pub struct PrismaticJointDef {
    pub base: JointBase,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis_a: Vec2,
    pub reference_angle: f32,
    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub max_motor_force: f32,
    pub motor_speed: f32,
}

impl PrismaticJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::new(1.0, 0.0),
            reference_angle: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            max_motor_force: 0.0,
            motor_speed: 0.0,
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

    pub fn local_axis_a<V: Into<Vec2>>(mut self, v: V) -> Self {
        self.local_axis_a = v.into().normalized();
        self
    }

    pub fn reference_angle(mut self, v: f32) -> Self {
        self.reference_angle = v;
        self
    }

    pub fn enable_limit(mut self, flag: bool) -> Self {
        self.enable_limit = flag;
        self
    }

    pub fn limits(mut self, lower: f32, upper: f32) -> Self {
        debug_assert!(lower <= upper);
        self.lower_translation = lower;
        self.upper_translation = upper;
        self
    }

    pub fn enable_motor(mut self, flag: bool) -> Self {
        self.enable_motor = flag;
        self
    }

    pub fn max_motor_force(mut self, v: f32) -> Self {
        self.max_motor_force = v;
        self
    }

    pub fn motor_speed(mut self, v: f32) -> Self {
        self.motor_speed = v;
        self
    }

    /// Derive local anchors, axis, and reference angle from a world anchor
    /// and world axis.
    pub fn world_anchor_axis<VA: Into<Vec2>, AX: Into<Vec2>>(
        mut self,
        bodies: &Slab<Body>,
        anchor: VA,
        axis: AX,
    ) -> Self {
        let anchor = anchor.into();
        let axis = axis.into();
        let body_a = &bodies[self.base.body_a.0];
        let body_b = &bodies[self.base.body_b.0];
        self.local_anchor_a = body_a.local_point(anchor);
        self.local_anchor_b = body_b.local_point(anchor);
        self.local_axis_a = body_a.local_vector(axis).normalized();
        self.reference_angle = body_b.angle() - body_a.angle();
        self
    }
}

#[derive(Clone, Debug)]
pub struct PrismaticJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    local_axis_a: Vec2,
    local_y_axis_a: Vec2,
    reference_angle: f32,
    enable_limit: bool,
    lower_translation: f32,
    upper_translation: f32,
    enable_motor: bool,
    max_motor_force: f32,
    motor_speed: f32,

    impulse: Vec2,
    motor_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,

    cache: JointSolverCache,
    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    axial_mass: f32,
    k: Mat22,
    translation: f32,
}

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef) -> Self {
        let local_axis_a = def.local_axis_a.normalized();
        Self {
            base: def.base,
            island_flag: false,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_axis_a,
            local_y_axis_a: cross_scalar_vec(1.0, local_axis_a),
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            enable_motor: def.enable_motor,
            max_motor_force: def.max_motor_force,
            motor_speed: def.motor_speed,
            impulse: Vec2::ZERO,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            cache: JointSolverCache::default(),
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            axial_mass: 0.0,
            k: Mat22::default(),
            translation: 0.0,
        }
    }

    pub fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    pub fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }

    pub fn local_axis_a(&self) -> Vec2 {
        self.local_axis_a
    }

    pub fn joint_translation(&self, bodies: &Slab<Body>) -> f32 {
        let body_a = &bodies[self.base.body_a.0];
        let body_b = &bodies[self.base.body_b.0];
        let p_a = body_a.world_point(self.local_anchor_a);
        let p_b = body_b.world_point(self.local_anchor_b);
        let axis = body_a.world_vector(self.local_axis_a);
        (p_b - p_a).dot(axis)
    }

    pub fn is_limit_enabled(&self) -> bool {
        self.enable_limit
    }

    pub fn set_limit_enabled(&mut self, flag: bool) {
        if flag != self.enable_limit {
            self.enable_limit = flag;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        debug_assert!(lower <= upper);
        if lower != self.lower_translation || upper != self.upper_translation {
            self.lower_translation = lower;
            self.upper_translation = upper;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    pub fn is_motor_enabled(&self) -> bool {
        self.enable_motor
    }

    pub fn set_motor_enabled(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    pub fn set_motor_speed(&mut self, v: f32) {
        self.motor_speed = v;
    }

    pub fn set_max_motor_force(&mut self, v: f32) {
        self.max_motor_force = v;
    }

    pub fn motor_force(&self, inv_dt: f32) -> f32 {
        self.motor_impulse * inv_dt
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].world_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (self.perp * self.impulse.x
            + self.axis * (self.motor_impulse + self.lower_impulse - self.upper_impulse))
            * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.impulse.y * inv_dt
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

        let ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
        let rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);
        let d = c_b - c_a + rb - ra;

        let m_a = c.inv_mass_a;
        let m_b = c.inv_mass_b;
        let i_a = c.inv_i_a;
        let i_b = c.inv_i_b;

        // Motor and limit Jacobian.
        self.axis = q_a.rotate_vec(self.local_axis_a);
        self.a1 = (d + ra).cross(self.axis);
        self.a2 = rb.cross(self.axis);

        let inv_mass = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;
        self.axial_mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        // Perpendicular constraint Jacobian.
        self.perp = q_a.rotate_vec(self.local_y_axis_a);
        self.s1 = (d + ra).cross(self.perp);
        self.s2 = rb.cross(self.perp);

        let k11 = m_a + m_b + i_a * self.s1 * self.s1 + i_b * self.s2 * self.s2;
        let k12 = i_a * self.s1 + i_b * self.s2;
        let mut k22 = i_a + i_b;
        if k22 == 0.0 {
            // Both bodies have fixed rotation.
            k22 = 1.0;
        }
        self.k = Mat22::new(Vec2::new(k11, k12), Vec2::new(k12, k22));

        self.translation = self.axis.dot(d);

        if !self.enable_limit {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;
            self.lower_impulse *= data.step.dt_ratio;
            self.upper_impulse *= data.step.dt_ratio;

            let axial = self.motor_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.perp * self.impulse.x + self.axis * axial;
            let l_a = self.impulse.x * self.s1 + self.impulse.y + axial * self.a1;
            let l_b = self.impulse.x * self.s2 + self.impulse.y + axial * self.a2;

            data.velocities[c.index_a].v -= p * m_a;
            data.velocities[c.index_a].w -= i_a * l_a;
            data.velocities[c.index_b].v += p * m_b;
            data.velocities[c.index_b].w += i_b * l_b;
        } else {
            self.impulse = Vec2::ZERO;
            self.motor_impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
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

        // Motor.
        if self.enable_motor {
            let c_dot = self.axis.dot(v_b - v_a) + self.a2 * w_b - self.a1 * w_a;
            let mut impulse = self.axial_mass * (self.motor_speed - c_dot);
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_force * data.step.dt;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            let p = self.axis * impulse;
            let l_a = impulse * self.a1;
            let l_b = impulse * self.a2;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
        }

        if self.enable_limit {
            // Lower limit.
            {
                let error = self.translation - self.lower_translation;
                let bias = error.min(0.0) * data.step.inv_dt;
                let c_dot = self.axis.dot(v_b - v_a) + self.a2 * w_b - self.a1 * w_a;
                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                impulse = self.lower_impulse - old_impulse;

                let p = self.axis * impulse;
                v_a -= p * m_a;
                w_a -= i_a * impulse * self.a1;
                v_b += p * m_b;
                w_b += i_b * impulse * self.a2;
            }

            // Upper limit.
            {
                let error = self.upper_translation - self.translation;
                let bias = error.min(0.0) * data.step.inv_dt;
                let c_dot = self.axis.dot(v_a - v_b) + self.a1 * w_a - self.a2 * w_b;
                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                impulse = self.upper_impulse - old_impulse;

                let p = self.axis * impulse;
                v_a += p * m_a;
                w_a += i_a * impulse * self.a1;
                v_b -= p * m_b;
                w_b -= i_b * impulse * self.a2;
            }
        }

        // Perpendicular + angular constraint.
        {
            let c_dot = Vec2::new(
                self.perp.dot(v_b - v_a) + self.s2 * w_b - self.s1 * w_a,
                w_b - w_a,
            );
            let df = self.k.solve(-c_dot);
            self.impulse += df;

            let p = self.perp * df.x;
            let l_a = df.x * self.s1 + df.y;
            let l_b = df.x * self.s2 + df.y;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
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
        let d = c_b + rb - c_a - ra;

        let axis = q_a.rotate_vec(self.local_axis_a);
        let a1 = (d + ra).cross(axis);
        let a2 = rb.cross(axis);
        let perp = q_a.rotate_vec(self.local_y_axis_a);
        let s1 = (d + ra).cross(perp);
        let s2 = rb.cross(perp);

        let c1 = Vec2::new(perp.dot(d), a_b - a_a - self.reference_angle);
        let mut linear_error = c1.x.abs();
        let angular_error = c1.y.abs();

        let mut active = false;
        let mut c2 = 0.0;
        if self.enable_limit {
            let translation = axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * tuning::LINEAR_SLOP
            {
                c2 = translation
                    .clamp(-tuning::MAX_LINEAR_CORRECTION, tuning::MAX_LINEAR_CORRECTION);
                linear_error = linear_error.max(translation.abs());
                active = true;
            } else if translation <= self.lower_translation {
                c2 = (translation - self.lower_translation + tuning::LINEAR_SLOP)
                    .clamp(-tuning::MAX_LINEAR_CORRECTION, 0.0);
                linear_error = linear_error.max(self.lower_translation - translation);
                active = true;
            } else if translation >= self.upper_translation {
                c2 = (translation - self.upper_translation - tuning::LINEAR_SLOP)
                    .clamp(0.0, tuning::MAX_LINEAR_CORRECTION);
                linear_error = linear_error.max(translation - self.upper_translation);
                active = true;
            }
        }

        let impulse: Vec3;
        if active {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let k13 = i_a * s1 * a1 + i_b * s2 * a2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }
            let k23 = i_a * a1 + i_b * a2;
            let k33 = m_a + m_b + i_a * a1 * a1 + i_b * a2 * a2;

            let k = Mat33 {
                ex: Vec3::new(k11, k12, k13),
                ey: Vec3::new(k12, k22, k23),
                ez: Vec3::new(k13, k23, k33),
            };
            impulse = k.solve33(-Vec3::new(c1.x, c1.y, c2));
        } else {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }
            let k = Mat22::new(Vec2::new(k11, k12), Vec2::new(k12, k22));
            let impulse1 = k.solve(-c1);
            impulse = Vec3::new(impulse1.x, impulse1.y, 0.0);
        }

        let p = perp * impulse.x + axis * impulse.z;
        let l_a = impulse.x * s1 + impulse.y + impulse.z * a1;
        let l_b = impulse.x * s2 + impulse.y + impulse.z * a2;

        c_a -= p * m_a;
        a_a -= i_a * l_a;
        c_b += p * m_b;
        a_b += i_b * l_b;

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;

        linear_error <= tuning::LINEAR_SLOP && angular_error <= tuning::ANGULAR_SLOP
    }
}
