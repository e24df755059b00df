//! Time of impact via conservative advancement.
//!
//! Finds the first time in `[0, t_max]` at which two swept convex shapes reach
//! a target separation, without missing intermediate collisions. The outer
//! loop advances a GJK distance query; the inner loop root-finds along a
//! swept separating axis built from the GJK witness simplex.

use crate::collision::distance::{distance, DistanceInput, DistanceProxy, SimplexCache};
use crate::core::math::{Sweep, Transform};
use crate::tuning;
use crate::types::Vec2;

#[derive(Copy, Clone, Debug)]
pub struct ToiInput<'a> {
    pub proxy_a: &'a DistanceProxy,
    pub proxy_b: &'a DistanceProxy,
    pub sweep_a: Sweep,
    pub sweep_b: Sweep,
    pub t_max: f32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ToiState {
    Unknown,
    /// The root finder stalled; `t` is the best known safe time.
    Failed,
    /// The shapes already overlap at `t = 0`.
    Overlapped,
    /// Target separation reached at `t`.
    Touching,
    /// No impact within `[0, t_max]`.
    Separated,
}

#[derive(Copy, Clone, Debug)]
pub struct ToiOutput {
    pub state: ToiState,
    pub t: f32,
    pub iterations: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum SeparationType {
    Points,
    FaceA,
    FaceB,
}

/// Swept separation along an axis fixed from the GJK witness features.
struct SeparationFunction<'a> {
    proxy_a: &'a DistanceProxy,
    proxy_b: &'a DistanceProxy,
    sweep_a: Sweep,
    sweep_b: Sweep,
    sep_type: SeparationType,
    local_point: Vec2,
    axis: Vec2,
}

impl<'a> SeparationFunction<'a> {
    fn new(
        cache: &SimplexCache,
        proxy_a: &'a DistanceProxy,
        sweep_a: Sweep,
        proxy_b: &'a DistanceProxy,
        sweep_b: Sweep,
        t1: f32,
    ) -> Self {
        debug_assert!(cache.count > 0 && cache.count < 3);

        let xf_a = sweep_a.transform(t1);
        let xf_b = sweep_b.transform(t1);

        if cache.count == 1 {
            // Points
            let local_point_a = proxy_a.vertex(cache.index_a[0] as usize);
            let local_point_b = proxy_b.vertex(cache.index_b[0] as usize);
            let point_a = xf_a.transform_point(local_point_a);
            let point_b = xf_b.transform_point(local_point_b);
            let axis = (point_b - point_a).normalized();
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                sep_type: SeparationType::Points,
                local_point: Vec2::ZERO,
                axis,
            }
        } else if cache.index_a[0] == cache.index_a[1] {
            // Two points on B, one on A: face B.
            let local_point_b1 = proxy_b.vertex(cache.index_b[0] as usize);
            let local_point_b2 = proxy_b.vertex(cache.index_b[1] as usize);

            let mut axis = (local_point_b2 - local_point_b1).cross_scalar(1.0);
            axis.normalize();
            let normal = xf_b.q.rotate_vec(axis);

            let local_point = (local_point_b1 + local_point_b2) * 0.5;
            let point_b = xf_b.transform_point(local_point);

            let local_point_a = proxy_a.vertex(cache.index_a[0] as usize);
            let point_a = xf_a.transform_point(local_point_a);

            if (point_a - point_b).dot(normal) < 0.0 {
                axis = -axis;
            }
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                sep_type: SeparationType::FaceB,
                local_point,
                axis,
            }
        } else {
            // Two points on A, one or two on B: face A.
            let local_point_a1 = proxy_a.vertex(cache.index_a[0] as usize);
            let local_point_a2 = proxy_a.vertex(cache.index_a[1] as usize);

            let mut axis = (local_point_a2 - local_point_a1).cross_scalar(1.0);
            axis.normalize();
            let normal = xf_a.q.rotate_vec(axis);

            let local_point = (local_point_a1 + local_point_a2) * 0.5;
            let point_a = xf_a.transform_point(local_point);

            let local_point_b = proxy_b.vertex(cache.index_b[0] as usize);
            let point_b = xf_b.transform_point(local_point_b);

            if (point_b - point_a).dot(normal) < 0.0 {
                axis = -axis;
            }
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                sep_type: SeparationType::FaceA,
                local_point,
                axis,
            }
        }
    }

    /// Minimum separation over all support pairs at time `t`, and the pair
    /// achieving it.
    fn find_min_separation(&self, t: f32) -> (f32, usize, usize) {
        let xf_a = self.sweep_a.transform(t);
        let xf_b = self.sweep_b.transform(t);

        match self.sep_type {
            SeparationType::Points => {
                let axis_a = xf_a.q.inv_rotate_vec(self.axis);
                let axis_b = xf_b.q.inv_rotate_vec(-self.axis);

                let index_a = self.proxy_a.support(axis_a);
                let index_b = self.proxy_b.support(axis_b);

                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(self.axis), index_a, index_b)
            }
            SeparationType::FaceA => {
                let normal = xf_a.q.rotate_vec(self.axis);
                let point_a = xf_a.transform_point(self.local_point);

                let axis_b = xf_b.q.inv_rotate_vec(-normal);
                let index_b = self.proxy_b.support(axis_b);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(normal), usize::MAX, index_b)
            }
            SeparationType::FaceB => {
                let normal = xf_b.q.rotate_vec(self.axis);
                let point_b = xf_b.transform_point(self.local_point);

                let axis_a = xf_a.q.inv_rotate_vec(-normal);
                let index_a = self.proxy_a.support(axis_a);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));

                ((point_a - point_b).dot(normal), index_a, usize::MAX)
            }
        }
    }

    /// Separation of a fixed witness pair at time `t`.
    fn evaluate(&self, index_a: usize, index_b: usize, t: f32) -> f32 {
        let xf_a = self.sweep_a.transform(t);
        let xf_b = self.sweep_b.transform(t);

        match self.sep_type {
            SeparationType::Points => {
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(self.axis)
            }
            SeparationType::FaceA => {
                let normal = xf_a.q.rotate_vec(self.axis);
                let point_a = xf_a.transform_point(self.local_point);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(normal)
            }
            SeparationType::FaceB => {
                let normal = xf_b.q.rotate_vec(self.axis);
                let point_b = xf_b.transform_point(self.local_point);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                (point_a - point_b).dot(normal)
            }
        }
    }
}

/// Compute the time of impact of two swept shapes in `[0, input.t_max]`.
///
/// Sweeps must share the interval: the caller advances both to a common
/// `alpha0` first. The shapes are treated as cores shrunk by the slop-derived
/// target so the solver still has room to operate at the reported time.
pub fn time_of_impact(input: &ToiInput) -> ToiOutput {
    let mut output = ToiOutput {
        state: ToiState::Unknown,
        t: input.t_max,
        iterations: 0,
    };

    let proxy_a = input.proxy_a;
    let proxy_b = input.proxy_b;

    let mut sweep_a = input.sweep_a;
    let mut sweep_b = input.sweep_b;

    // Large rotations can make the root finder non-monotonic; normalizing
    // keeps the sweep angles sane.
    sweep_a.normalize();
    sweep_b.normalize();

    let t_max = input.t_max;

    let total_radius = proxy_a.radius() + proxy_b.radius();
    let target = tuning::LINEAR_SLOP.max(total_radius - 3.0 * tuning::LINEAR_SLOP);
    let tolerance = 0.25 * tuning::LINEAR_SLOP;
    debug_assert!(target > tolerance);

    let mut t1 = 0.0;
    const MAX_ITERATIONS: usize = 20;
    let mut iteration = 0;

    let mut cache = SimplexCache::default();

    // Outer loop: advance t1 until the shapes reach the target separation or
    // the interval is exhausted.
    loop {
        let xf_a = sweep_a.transform(t1);
        let xf_b = sweep_b.transform(t1);

        let distance_output = distance(
            &mut cache,
            &DistanceInput {
                proxy_a,
                proxy_b,
                transform_a: xf_a,
                transform_b: xf_b,
                use_radii: false,
            },
        );

        if distance_output.distance <= 0.0 {
            // Failure: initial overlap.
            output.state = ToiState::Overlapped;
            output.t = 0.0;
            break;
        }

        if distance_output.distance < target + tolerance {
            // Victory: touching within tolerance.
            output.state = ToiState::Touching;
            output.t = t1;
            break;
        }

        let fcn = SeparationFunction::new(&cache, proxy_a, sweep_a, proxy_b, sweep_b, t1);

        // Inner loop: resolve the deepest point at t2, then push t1 forward.
        let mut done = false;
        let mut t2 = t_max;
        let mut push_back_iteration = 0;
        loop {
            let (mut s2, index_a, index_b) = fcn.find_min_separation(t2);

            if s2 > target + tolerance {
                // Final configuration is separated.
                output.state = ToiState::Separated;
                output.t = t_max;
                done = true;
                break;
            }

            if s2 > target - tolerance {
                // Advance the sweeps.
                t1 = t2;
                break;
            }

            let mut s1 = fcn.evaluate(index_a, index_b, t1);

            if s1 < target - tolerance {
                // The interval start already violates the target: the
                // advancement was too aggressive (or shapes are moving fast).
                output.state = ToiState::Failed;
                output.t = t1;
                done = true;
                break;
            }

            if s1 <= target + tolerance {
                // t1 itself touches.
                output.state = ToiState::Touching;
                output.t = t1;
                done = true;
                break;
            }

            // Root find on [t1, t2] for s(t) = target, mixing secant steps
            // with bisection for robustness.
            let mut root_iterations = 0;
            let mut a1 = t1;
            let mut a2 = t2;
            loop {
                let t = if root_iterations & 1 == 1 {
                    a1 + (target - s1) * (a2 - a1) / (s2 - s1)
                } else {
                    0.5 * (a1 + a2)
                };
                root_iterations += 1;

                let s = fcn.evaluate(index_a, index_b, t);

                if (s - target).abs() < tolerance {
                    t2 = t;
                    break;
                }

                if s > target {
                    a1 = t;
                    s1 = s;
                } else {
                    a2 = t;
                    s2 = s;
                }

                if root_iterations == 50 {
                    break;
                }
            }

            push_back_iteration += 1;
            if push_back_iteration == tuning::MAX_POLYGON_VERTICES {
                break;
            }
        }

        iteration += 1;
        output.iterations = iteration;
        if done {
            break;
        }

        if iteration == MAX_ITERATIONS {
            // Root finder got stuck; report the best known safe time.
            log::debug!("time_of_impact exceeded {MAX_ITERATIONS} iterations");
            output.state = ToiState::Failed;
            output.t = t1;
            break;
        }
    }

    output
}
