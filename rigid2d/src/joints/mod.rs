//! Joints API
//!
//! Joints constrain two bodies. Every variant implements the same solver
//! trio: `init_velocity_constraints` builds effective masses from the island
//! state, `solve_velocity_constraints` applies impulses each velocity
//! iteration, and `solve_position_constraints` corrects residual positional
//! error, reporting whether it is within slop.
//!
//! Soft constraints take stiffness (N/m) and damping (N*s/m) directly; use
//! [`crate::tuning::linear_stiffness`] / [`crate::tuning::angular_stiffness`]
//! to derive them from a frequency and damping ratio.

pub mod angle;
pub mod distance;
pub mod friction;
pub mod gear;
pub mod motor;
pub mod mouse;
pub mod prismatic;
pub mod pulley;
pub mod revolute;
pub mod rope;
pub mod weld;
pub mod wheel;

pub use angle::{AngleJoint, AngleJointDef};
pub use distance::{DistanceJoint, DistanceJointDef};
pub use friction::{FrictionJoint, FrictionJointDef};
pub use gear::{GearJoint, GearJointDef};
pub use motor::{MotorJoint, MotorJointDef};
pub use mouse::{MouseJoint, MouseJointDef};
pub use prismatic::{PrismaticJoint, PrismaticJointDef};
pub use pulley::{PulleyJoint, PulleyJointDef};
pub use revolute::{RevoluteJoint, RevoluteJointDef};
pub use rope::{RopeJoint, RopeJointDef};
pub use weld::{WeldJoint, WeldJointDef};
pub use wheel::{WheelJoint, WheelJointDef};

use slab::Slab;

use crate::body::Body;
use crate::time_step::SolverData;
use crate::types::{BodyId, Vec2};

/// Joint construction failure.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum JointError {
    #[error("joint ratio must be non-zero")]
    ZeroRatio,
    #[error("gear joint must reference revolute or prismatic joints")]
    BadGearReference,
}

/// State common to every joint variant: the connected bodies and whether
/// those bodies may still collide with each other.
#[derive(Copy, Clone, Debug)]
pub struct JointBase {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub collide_connected: bool,
    pub user_data: u64,
}

impl JointBase {
    pub fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            user_data: 0,
        }
    }

    pub fn collide_connected(mut self, flag: bool) -> Self {
        self.collide_connected = flag;
        self
    }

    pub fn user_data(mut self, v: u64) -> Self {
        self.user_data = v;
        self
    }
}

/// A constraint connecting two bodies, one variant per kind.
#[derive(Clone, Debug)]
pub enum Joint {
    Distance(DistanceJoint),
    Revolute(RevoluteJoint),
    Prismatic(PrismaticJoint),
    Pulley(PulleyJoint),
    Gear(GearJoint),
    Wheel(WheelJoint),
    Weld(WeldJoint),
    Friction(FrictionJoint),
    Motor(MotorJoint),
    Mouse(MouseJoint),
    Rope(RopeJoint),
    Angle(AngleJoint),
}

macro_rules! dispatch {
    ($self:expr, $j:ident => $body:expr) => {
        match $self {
            Joint::Distance($j) => $body,
            Joint::Revolute($j) => $body,
            Joint::Prismatic($j) => $body,
            Joint::Pulley($j) => $body,
            Joint::Gear($j) => $body,
            Joint::Wheel($j) => $body,
            Joint::Weld($j) => $body,
            Joint::Friction($j) => $body,
            Joint::Motor($j) => $body,
            Joint::Mouse($j) => $body,
            Joint::Rope($j) => $body,
            Joint::Angle($j) => $body,
        }
    };
}

impl Joint {
    pub fn base(&self) -> &JointBase {
        dispatch!(self, j => &j.base)
    }

    pub fn body_a(&self) -> BodyId {
        self.base().body_a
    }

    pub fn body_b(&self) -> BodyId {
        self.base().body_b
    }

    pub fn collide_connected(&self) -> bool {
        self.base().collide_connected
    }

    pub fn user_data(&self) -> u64 {
        self.base().user_data
    }

    /// World anchor on body A.
    pub fn anchor_a(&self, bodies: &Slab<Body>) -> Vec2 {
        dispatch!(self, j => j.anchor_a(bodies))
    }

    /// World anchor on body B.
    pub fn anchor_b(&self, bodies: &Slab<Body>) -> Vec2 {
        dispatch!(self, j => j.anchor_b(bodies))
    }

    /// Accumulated reaction force at the B anchor for the given inverse dt.
    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        dispatch!(self, j => j.reaction_force(inv_dt))
    }

    /// Accumulated reaction torque for the given inverse dt.
    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        dispatch!(self, j => j.reaction_torque(inv_dt))
    }

    pub(crate) fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &Slab<Body>) {
        dispatch!(self, j => j.init_velocity_constraints(data, bodies))
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        dispatch!(self, j => j.solve_velocity_constraints(data))
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        dispatch!(self, j => j.solve_position_constraints(data))
    }

    /// World-space state must follow an origin shift. Only joints holding
    /// world coordinates (pulley ground anchors, mouse target) react.
    pub(crate) fn shift_origin(&mut self, new_origin: Vec2) {
        match self {
            Joint::Pulley(j) => j.shift_origin(new_origin),
            Joint::Mouse(j) => j.shift_origin(new_origin),
            _ => {}
        }
    }

    pub(crate) fn island_flag(&self) -> bool {
        dispatch!(self, j => j.island_flag)
    }

    pub(crate) fn set_island_flag(&mut self, flag: bool) {
        dispatch!(self, j => j.island_flag = flag)
    }
}

/// Shared per-joint solver scratch: island indices and mass data of the two
/// bodies, captured at the start of each solve.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct JointSolverCache {
    pub index_a: usize,
    pub index_b: usize,
    pub local_center_a: Vec2,
    pub local_center_b: Vec2,
    pub inv_mass_a: f32,
    pub inv_mass_b: f32,
    pub inv_i_a: f32,
    pub inv_i_b: f32,
}

impl JointSolverCache {
    pub fn gather(base: &JointBase, bodies: &Slab<Body>) -> Self {
        let body_a = &bodies[base.body_a.0];
        let body_b = &bodies[base.body_b.0];
        Self {
            index_a: body_a.island_index,
            index_b: body_b.island_index,
            local_center_a: body_a.sweep.local_center,
            local_center_b: body_b.sweep.local_center,
            inv_mass_a: body_a.inv_mass,
            inv_mass_b: body_b.inv_mass,
            inv_i_a: body_a.inv_inertia,
            inv_i_b: body_b.inv_inertia,
        }
    }
}
