//! Revolute joint: pins two bodies at a point, leaving only relative
//! rotation, with an optional angular limit and motor.

use slab::Slab;

use crate::body::Body;
use crate::core::math::{Mat22, Rot};
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{cross_scalar_vec, Vec2};

/// Revolute joint definition.
#[derive(Clone, Debug)]
pub struct RevoluteJointDef {
    pub base: JointBase,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// `body_b.angle - body_a.angle` at rest.
    pub reference_angle: f32,
    pub enable_limit: bool,
    pub lower_angle: f32,
    pub upper_angle: f32,
    pub enable_motor: bool,
    pub motor_speed: f32,
    pub max_motor_torque: f32,
}

impl RevoluteJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
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

    pub fn enable_limit(mut self, flag: bool) -> Self {
        self.enable_limit = flag;
        self
    }

    pub fn limits(mut self, lower: f32, upper: f32) -> Self {
        debug_assert!(lower <= upper);
        self.lower_angle = lower;
        self.upper_angle = upper;
        self
    }

    pub fn enable_motor(mut self, flag: bool) -> Self {
        self.enable_motor = flag;
        self
    }

    pub fn motor_speed(mut self, v: f32) -> Self {
        self.motor_speed = v;
        self
    }

    pub fn max_motor_torque(mut self, v: f32) -> Self {
        self.max_motor_torque = v;
        self
    }

    /// Derive the local anchors and reference angle from a world pivot.
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
pub struct RevoluteJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f32,
    enable_limit: bool,
    lower_angle: f32,
    upper_angle: f32,
    enable_motor: bool,
    motor_speed: f32,
    max_motor_torque: f32,

    impulse: Vec2,
    motor_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,

    cache: JointSolverCache,
    ra: Vec2,
    rb: Vec2,
    k: Mat22,
    axial_mass: f32,
    angle: f32,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef) -> Self {
        Self {
            base: def.base,
            island_flag: false,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            impulse: Vec2::ZERO,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            cache: JointSolverCache::default(),
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            k: Mat22::default(),
            axial_mass: 0.0,
            angle: 0.0,
        }
    }

    pub fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    pub fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }

    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Relative angle of the two bodies minus the reference angle.
    pub fn joint_angle(&self, bodies: &Slab<Body>) -> f32 {
        bodies[self.base.body_b.0].sweep.a - bodies[self.base.body_a.0].sweep.a
            - self.reference_angle
    }

    pub fn joint_speed(&self, bodies: &Slab<Body>) -> f32 {
        bodies[self.base.body_b.0].angular_velocity() - bodies[self.base.body_a.0].angular_velocity()
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
        if lower != self.lower_angle || upper != self.upper_angle {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
            self.lower_angle = lower;
            self.upper_angle = upper;
        }
    }

    pub fn is_motor_enabled(&self) -> bool {
        self.enable_motor
    }

    pub fn set_motor_enabled(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    pub fn set_motor_speed(&mut self, speed: f32) {
        self.motor_speed = speed;
    }

    pub fn motor_speed(&self) -> f32 {
        self.motor_speed
    }

    pub fn set_max_motor_torque(&mut self, torque: f32) {
        self.max_motor_torque = torque;
    }

    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        self.motor_impulse * inv_dt
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].world_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.impulse * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        (self.motor_impulse + self.lower_impulse - self.upper_impulse) * inv_dt
    }

    fn fixed_rotation(&self) -> bool {
        self.cache.inv_i_a + self.cache.inv_i_b == 0.0
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

        self.k = Mat22::new(
            Vec2::new(
                m_a + m_b + self.ra.y * self.ra.y * i_a + self.rb.y * self.rb.y * i_b,
                -self.ra.y * self.ra.x * i_a - self.rb.y * self.rb.x * i_b,
            ),
            Vec2::new(
                -self.ra.y * self.ra.x * i_a - self.rb.y * self.rb.x * i_b,
                m_a + m_b + self.ra.x * self.ra.x * i_a + self.rb.x * self.rb.x * i_b,
            ),
        );

        self.axial_mass = if i_a + i_b > 0.0 {
            1.0 / (i_a + i_b)
        } else {
            0.0
        };
        self.angle = a_b - a_a - self.reference_angle;

        if !self.enable_limit || self.fixed_rotation() {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
        if !self.enable_motor || self.fixed_rotation() {
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;
            self.lower_impulse *= data.step.dt_ratio;
            self.upper_impulse *= data.step.dt_ratio;

            let axial = self.motor_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.impulse;

            data.velocities[c.index_a].v -= p * m_a;
            data.velocities[c.index_a].w -= i_a * (self.ra.cross(p) + axial);
            data.velocities[c.index_b].v += p * m_b;
            data.velocities[c.index_b].w += i_b * (self.rb.cross(p) + axial);
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

        let fixed_rotation = self.fixed_rotation();

        // Motor.
        if self.enable_motor && !fixed_rotation {
            let c_dot = w_b - w_a - self.motor_speed;
            let mut impulse = -self.axial_mass * c_dot;
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_torque * data.step.dt;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        if self.enable_limit && !fixed_rotation {
            // Lower limit.
            {
                let error = self.angle - self.lower_angle;
                let bias = error.min(0.0) * data.step.inv_dt;
                let c_dot = w_b - w_a;
                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                impulse = self.lower_impulse - old_impulse;

                w_a -= i_a * impulse;
                w_b += i_b * impulse;
            }

            // Upper limit, sign flipped.
            {
                let error = self.upper_angle - self.angle;
                let bias = error.min(0.0) * data.step.inv_dt;
                let c_dot = w_a - w_b;
                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                impulse = self.upper_impulse - old_impulse;

                w_a += i_a * impulse;
                w_b -= i_b * impulse;
            }
        }

        // Point constraint.
        {
            let c_dot =
                v_b + cross_scalar_vec(w_b, self.rb) - v_a - cross_scalar_vec(w_a, self.ra);
            let impulse = self.k.solve(-c_dot);

            self.impulse += impulse;

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

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let c = self.cache;
        let mut c_a = data.positions[c.index_a].c;
        let mut a_a = data.positions[c.index_a].a;
        let mut c_b = data.positions[c.index_b].c;
        let mut a_b = data.positions[c.index_b].a;

        let mut angular_error = 0.0;

        // Angular limit correction.
        if self.enable_limit && !self.fixed_rotation() {
            let angle = a_b - a_a - self.reference_angle;
            let mut correction = 0.0;

            if (self.upper_angle - self.lower_angle).abs() < 2.0 * tuning::ANGULAR_SLOP {
                correction = (angle - self.lower_angle)
                    .clamp(-tuning::MAX_ANGULAR_CORRECTION, tuning::MAX_ANGULAR_CORRECTION);
            } else if angle <= self.lower_angle {
                correction = (angle - self.lower_angle + tuning::ANGULAR_SLOP)
                    .clamp(-tuning::MAX_ANGULAR_CORRECTION, 0.0);
            } else if angle >= self.upper_angle {
                correction = (angle - self.upper_angle - tuning::ANGULAR_SLOP)
                    .clamp(0.0, tuning::MAX_ANGULAR_CORRECTION);
            }

            let limit_impulse = -self.axial_mass * correction;
            a_a -= c.inv_i_a * limit_impulse;
            a_b += c.inv_i_b * limit_impulse;
            angular_error = correction.abs();
        }

        // Point correction.
        let position_error;
        {
            let q_a = Rot::from_radians(a_a);
            let q_b = Rot::from_radians(a_b);
            let ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
            let rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);

            let error = c_b + rb - c_a - ra;
            position_error = error.length();

            let m_a = c.inv_mass_a;
            let m_b = c.inv_mass_b;
            let i_a = c.inv_i_a;
            let i_b = c.inv_i_b;

            let k = Mat22::new(
                Vec2::new(
                    m_a + m_b + i_a * ra.y * ra.y + i_b * rb.y * rb.y,
                    -i_a * ra.x * ra.y - i_b * rb.x * rb.y,
                ),
                Vec2::new(
                    -i_a * ra.x * ra.y - i_b * rb.x * rb.y,
                    m_a + m_b + i_a * ra.x * ra.x + i_b * rb.x * rb.x,
                ),
            );

            let impulse = -k.solve(error);

            c_a -= impulse * m_a;
            a_a -= i_a * ra.cross(impulse);
            c_b += impulse * m_b;
            a_b += i_b * rb.cross(impulse);
        }

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;

        position_error <= tuning::LINEAR_SLOP && angular_error <= tuning::ANGULAR_SLOP
    }
}
