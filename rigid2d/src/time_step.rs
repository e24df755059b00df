//! Per-step solver context and the island-local state arrays.

use crate::types::Vec2;

/// Timing and iteration parameters for one solve.
#[derive(Copy, Clone, Debug)]
pub struct TimeStep {
    pub dt: f32,
    pub inv_dt: f32,
    /// `dt * inv_dt0`, used to scale warm-started impulses when the step
    /// size changes between frames.
    pub dt_ratio: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    pub warm_starting: bool,
}

/// Island-local position state, indexed by a body's island index.
#[derive(Copy, Clone, Debug, Default)]
pub struct Position {
    pub c: Vec2,
    pub a: f32,
}

/// Island-local velocity state, indexed by a body's island index.
#[derive(Copy, Clone, Debug, Default)]
pub struct Velocity {
    pub v: Vec2,
    pub w: f32,
}

/// Mutable view of the island state handed to joint solvers.
pub(crate) struct SolverData<'a> {
    pub step: TimeStep,
    pub positions: &'a mut [Position],
    pub velocities: &'a mut [Velocity],
}
