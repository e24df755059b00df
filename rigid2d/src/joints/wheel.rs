//! Wheel joint: a point constraint perpendicular to a suspension axis, with
//! a spring-damper along the axis, optional translation limits, and a wheel
//! motor about the anchor.

use slab::Slab;

use crate::body::Body;
use crate::core::math::Rot;
use crate::joints::{JointBase, JointSolverCache};
use crate::time_step::SolverData;
use crate::tuning;
use crate::types::{cross_scalar_vec, Vec2};

/// Wheel joint definition. The suspension axis is in body A's frame.
#[derive(Clone, Debug)]
pub struct WheelJointDef {
    pub base: JointBase,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis_a: Vec2,
    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub max_motor_torque: f32,
    pub motor_speed: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl WheelJointDef {
    pub fn new(base: JointBase) -> Self {
        Self {
            base,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::new(1.0, 0.0),
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            max_motor_torque: 0.0,
            motor_speed: 0.0,
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

    pub fn local_axis_a<V: Into<Vec2>>(mut self, v: V) -> Self {
        self.local_axis_a = v.into().normalized();
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

    pub fn max_motor_torque(mut self, v: f32) -> Self {
        self.max_motor_torque = v;
        self
    }

    pub fn motor_speed(mut self, v: f32) -> Self {
        self.motor_speed = v;
        self
    }

    /// Suspension stiffness in N/m.
    pub fn stiffness(mut self, v: f32) -> Self {
        self.stiffness = v;
        self
    }

    /// Suspension damping in N*s/m.
    pub fn damping(mut self, v: f32) -> Self {
        self.damping = v;
        self
    }

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
        self
    }
}

#[derive(Clone, Debug)]
pub struct WheelJoint {
    pub(crate) base: JointBase,
    pub(crate) island_flag: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    local_axis_a: Vec2,
    local_y_axis_a: Vec2,
    enable_limit: bool,
    lower_translation: f32,
    upper_translation: f32,
    enable_motor: bool,
    max_motor_torque: f32,
    motor_speed: f32,
    stiffness: f32,
    damping: f32,

    impulse: f32,
    motor_impulse: f32,
    spring_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,

    cache: JointSolverCache,
    ax: Vec2,
    ay: Vec2,
    s_ax: f32,
    s_bx: f32,
    s_ay: f32,
    s_by: f32,
    mass: f32,
    motor_mass: f32,
    axial_mass: f32,
    spring_mass: f32,
    bias: f32,
    gamma: f32,
    translation: f32,
}

impl WheelJoint {
    pub(crate) fn new(def: &WheelJointDef) -> Self {
        let local_axis_a = def.local_axis_a.normalized();
        Self {
            base: def.base,
            island_flag: false,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_axis_a,
            local_y_axis_a: cross_scalar_vec(1.0, local_axis_a),
            enable_limit: def.enable_limit,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            enable_motor: def.enable_motor,
            max_motor_torque: def.max_motor_torque,
            motor_speed: def.motor_speed,
            stiffness: def.stiffness,
            damping: def.damping,
            impulse: 0.0,
            motor_impulse: 0.0,
            spring_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            cache: JointSolverCache::default(),
            ax: Vec2::ZERO,
            ay: Vec2::ZERO,
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            axial_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
            translation: 0.0,
        }
    }

    pub fn set_stiffness(&mut self, v: f32) {
        self.stiffness = v;
    }

    pub fn set_damping(&mut self, v: f32) {
        self.damping = v;
    }

    pub fn set_motor_enabled(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    pub fn set_motor_speed(&mut self, v: f32) {
        self.motor_speed = v;
    }

    pub fn set_max_motor_torque(&mut self, v: f32) {
        self.max_motor_torque = v;
    }

    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        self.motor_impulse * inv_dt
    }

    pub fn joint_translation(&self, bodies: &Slab<Body>) -> f32 {
        let body_a = &bodies[self.base.body_a.0];
        let body_b = &bodies[self.base.body_b.0];
        let p_a = body_a.world_point(self.local_anchor_a);
        let p_b = body_b.world_point(self.local_anchor_b);
        let axis = body_a.world_vector(self.local_axis_a);
        (p_b - p_a).dot(axis)
    }

    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_a.0].world_point(self.local_anchor_a)
    }

    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        bodies[self.base.body_b.0].world_point(self.local_anchor_b)
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (self.ay * self.impulse
            + self.ax * (self.spring_impulse + self.lower_impulse - self.upper_impulse))
            * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.motor_impulse * inv_dt
    }

    pub(crate) fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &Slab<Body>) {
        self.cache = JointSolverCache::gather(&self.base, bodies);
        let c = self.cache;

        let m_a = c.inv_mass_a;
        let m_b = c.inv_mass_b;
        let i_a = c.inv_i_a;
        let i_b = c.inv_i_b;

        let c_a = data.positions[c.index_a].c;
        let a_a = data.positions[c.index_a].a;
        let c_b = data.positions[c.index_b].c;
        let a_b = data.positions[c.index_b].a;
        let q_a = Rot::from_radians(a_a);
        let q_b = Rot::from_radians(a_b);

        let ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
        let rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);
        let d = c_b + rb - c_a - ra;

        // Point to line constraint.
        self.ay = q_a.rotate_vec(self.local_y_axis_a);
        self.s_ay = (d + ra).cross(self.ay);
        self.s_by = rb.cross(self.ay);

        let k_point = m_a + m_b + i_a * self.s_ay * self.s_ay + i_b * self.s_by * self.s_by;
        self.mass = if k_point > 0.0 { 1.0 / k_point } else { 0.0 };

        // Spring and limit axis.
        self.ax = q_a.rotate_vec(self.local_axis_a);
        self.s_ax = (d + ra).cross(self.ax);
        self.s_bx = rb.cross(self.ax);

        let inv_mass = m_a + m_b + i_a * self.s_ax * self.s_ax + i_b * self.s_bx * self.s_bx;
        self.axial_mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;

        if self.stiffness > 0.0 && inv_mass > 0.0 {
            let error = d.dot(self.ax);
            let h = data.step.dt;
            self.gamma = h * (self.damping + h * self.stiffness);
            if self.gamma > 0.0 {
                self.gamma = 1.0 / self.gamma;
            }
            self.bias = error * h * self.stiffness * self.gamma;
            let spring_inv_mass = inv_mass + self.gamma;
            self.spring_mass = if spring_inv_mass > 0.0 {
                1.0 / spring_inv_mass
            } else {
                0.0
            };
        } else {
            self.spring_impulse = 0.0;
        }

        self.translation = self.ax.dot(d);

        if !self.enable_limit {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        if self.enable_motor {
            self.motor_mass = if i_a + i_b > 0.0 {
                1.0 / (i_a + i_b)
            } else {
                0.0
            };
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            self.spring_impulse *= data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;
            self.lower_impulse *= data.step.dt_ratio;
            self.upper_impulse *= data.step.dt_ratio;

            let axial = self.spring_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.ay * self.impulse + self.ax * axial;
            let l_a = self.impulse * self.s_ay + axial * self.s_ax + self.motor_impulse;
            let l_b = self.impulse * self.s_by + axial * self.s_bx + self.motor_impulse;

            data.velocities[c.index_a].v -= p * m_a;
            data.velocities[c.index_a].w -= i_a * l_a;
            data.velocities[c.index_b].v += p * m_b;
            data.velocities[c.index_b].w += i_b * l_b;
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
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

        // Suspension spring.
        if self.stiffness > 0.0 {
            let c_dot = self.ax.dot(v_b - v_a) + self.s_bx * w_b - self.s_ax * w_a;
            let impulse =
                -self.spring_mass * (c_dot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;

            let p = self.ax * impulse;
            v_a -= p * m_a;
            w_a -= i_a * impulse * self.s_ax;
            v_b += p * m_b;
            w_b += i_b * impulse * self.s_bx;
        }

        // Motor.
        if self.enable_motor {
            let c_dot = w_b - w_a - self.motor_speed;
            let mut impulse = -self.motor_mass * c_dot;
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_torque * data.step.dt;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        if self.enable_limit {
            // Lower translation limit.
            {
                let error = self.translation - self.lower_translation;
                let bias = error.min(0.0) * data.step.inv_dt;
                let c_dot = self.ax.dot(v_b - v_a) + self.s_bx * w_b - self.s_ax * w_a;
                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                impulse = self.lower_impulse - old_impulse;

                let p = self.ax * impulse;
                v_a -= p * m_a;
                w_a -= i_a * impulse * self.s_ax;
                v_b += p * m_b;
                w_b += i_b * impulse * self.s_bx;
            }

            // Upper translation limit.
            {
                let error = self.upper_translation - self.translation;
                let bias = error.min(0.0) * data.step.inv_dt;
                let c_dot = self.ax.dot(v_a - v_b) + self.s_ax * w_a - self.s_bx * w_b;
                let mut impulse = -self.axial_mass * (c_dot + bias);
                let old_impulse = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                impulse = self.upper_impulse - old_impulse;

                let p = self.ax * impulse;
                v_a += p * m_a;
                w_a += i_a * impulse * self.s_ax;
                v_b -= p * m_b;
                w_b -= i_b * impulse * self.s_bx;
            }
        }

        // Point to line.
        {
            let c_dot = self.ay.dot(v_b - v_a) + self.s_by * w_b - self.s_ay * w_a;
            let impulse = -self.mass * c_dot;
            self.impulse += impulse;

            let p = self.ay * impulse;
            v_a -= p * m_a;
            w_a -= i_a * impulse * self.s_ay;
            v_b += p * m_b;
            w_b += i_b * impulse * self.s_by;
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

        let mut linear_error = 0.0f32;

        // Limit correction along the axis.
        if self.enable_limit {
            let q_a = Rot::from_radians(a_a);
            let q_b = Rot::from_radians(a_b);
            let ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
            let rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);
            let d = c_b - c_a + rb - ra;

            let ax = q_a.rotate_vec(self.local_axis_a);
            let s_ax = (d + ra).cross(ax);
            let s_bx = rb.cross(ax);

            let translation = ax.dot(d);
            let mut error = 0.0;
            if (self.upper_translation - self.lower_translation).abs()
                < 2.0 * tuning::LINEAR_SLOP
            {
                error = translation;
            } else if translation <= self.lower_translation {
                error = (translation - self.lower_translation).min(0.0);
            } else if translation >= self.upper_translation {
                error = (translation - self.upper_translation).max(0.0);
            }

            if error != 0.0 {
                let inv_mass = c.inv_mass_a
                    + c.inv_mass_b
                    + c.inv_i_a * s_ax * s_ax
                    + c.inv_i_b * s_bx * s_bx;
                let impulse = if inv_mass != 0.0 { -error / inv_mass } else { 0.0 };
                let p = ax * impulse;

                c_a -= p * c.inv_mass_a;
                a_a -= c.inv_i_a * impulse * s_ax;
                c_b += p * c.inv_mass_b;
                a_b += c.inv_i_b * impulse * s_bx;

                linear_error = error.abs();
            }
        }

        // Perpendicular correction.
        {
            let q_a = Rot::from_radians(a_a);
            let q_b = Rot::from_radians(a_b);
            let ra = q_a.rotate_vec(self.local_anchor_a - c.local_center_a);
            let rb = q_b.rotate_vec(self.local_anchor_b - c.local_center_b);
            let d = c_b - c_a + rb - ra;

            let ay = q_a.rotate_vec(self.local_y_axis_a);
            let s_ay = (d + ra).cross(ay);
            let s_by = rb.cross(ay);

            let error = d.dot(ay);
            let k = c.inv_mass_a
                + c.inv_mass_b
                + c.inv_i_a * s_ay * s_ay
                + c.inv_i_b * s_by * s_by;
            let impulse = if k != 0.0 { -error / k } else { 0.0 };
            let p = ay * impulse;

            c_a -= p * c.inv_mass_a;
            a_a -= c.inv_i_a * impulse * s_ay;
            c_b += p * c.inv_mass_b;
            a_b += c.inv_i_b * impulse * s_by;

            linear_error = linear_error.max(error.abs());
        }

        data.positions[c.index_a].c = c_a;
        data.positions[c.index_a].a = a_a;
        data.positions[c.index_b].c = c_b;
        data.positions[c.index_b].a = a_b;

        linear_error <= tuning::LINEAR_SLOP
    }
}
