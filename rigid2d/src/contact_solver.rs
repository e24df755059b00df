//! Sequential-impulse contact solver.
//!
//! Velocity constraints use warm-started accumulated impulses with friction
//! clamped by the normal impulse; two-point manifolds are solved as a 2x2
//! block LCP by enumerating the four active-set cases. Position constraints
//! run a separate pseudo-impulse pass on the island position state.

use slab::Slab;

use crate::collision::manifold::{Manifold, ManifoldType, WorldManifold};
use crate::contact::Contact;
use crate::core::math::{Mat22, Rot, Transform};
use crate::time_step::{Position, TimeStep, Velocity};
use crate::tuning;
use crate::types::{cross_scalar_vec, ContactId, Vec2};

// The block solver keeps both points only while K is well conditioned.
const MAX_CONDITION_NUMBER: f32 = 1000.0;

/// Per-contact data gathered by the island before solving.
#[derive(Clone, Debug)]
pub(crate) struct ContactSolverInput {
    pub contact: ContactId,
    pub manifold: Manifold,
    pub index_a: usize,
    pub index_b: usize,
    pub inv_mass_a: f32,
    pub inv_mass_b: f32,
    pub inv_i_a: f32,
    pub inv_i_b: f32,
    pub local_center_a: Vec2,
    pub local_center_b: Vec2,
    pub radius_a: f32,
    pub radius_b: f32,
    pub friction: f32,
    pub restitution: f32,
    pub tangent_speed: f32,
}

#[derive(Copy, Clone, Debug, Default)]
struct VelocityConstraintPoint {
    ra: Vec2,
    rb: Vec2,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
}

#[derive(Clone, Debug)]
struct VelocityConstraint {
    points: [VelocityConstraintPoint; tuning::MAX_MANIFOLD_POINTS],
    normal: Vec2,
    normal_mass: Mat22,
    k: Mat22,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    friction: f32,
    restitution: f32,
    tangent_speed: f32,
    point_count: usize,
    contact_index: usize,
}

#[derive(Clone, Debug)]
struct PositionConstraint {
    local_points: [Vec2; tuning::MAX_MANIFOLD_POINTS],
    local_normal: Vec2,
    local_point: Vec2,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_i_a: f32,
    inv_i_b: f32,
    manifold_type: ManifoldType,
    radius_a: f32,
    radius_b: f32,
    point_count: usize,
}

pub(crate) struct ContactSolver {
    velocity_constraints: Vec<VelocityConstraint>,
    position_constraints: Vec<PositionConstraint>,
    inputs: Vec<ContactSolverInput>,
}

impl ContactSolver {
    pub fn new(step: &TimeStep, inputs: Vec<ContactSolverInput>) -> Self {
        let mut velocity_constraints = Vec::with_capacity(inputs.len());
        let mut position_constraints = Vec::with_capacity(inputs.len());

        for (contact_index, input) in inputs.iter().enumerate() {
            let manifold = &input.manifold;
            debug_assert!(manifold.point_count > 0);

            let mut vc = VelocityConstraint {
                points: [VelocityConstraintPoint::default(); tuning::MAX_MANIFOLD_POINTS],
                normal: Vec2::ZERO,
                normal_mass: Mat22::default(),
                k: Mat22::default(),
                index_a: input.index_a,
                index_b: input.index_b,
                inv_mass_a: input.inv_mass_a,
                inv_mass_b: input.inv_mass_b,
                inv_i_a: input.inv_i_a,
                inv_i_b: input.inv_i_b,
                friction: input.friction,
                restitution: input.restitution,
                tangent_speed: input.tangent_speed,
                point_count: manifold.point_count,
                contact_index,
            };
            for (j, vcp) in vc.points.iter_mut().enumerate().take(manifold.point_count) {
                let cp = &manifold.points[j];
                if step.warm_starting {
                    vcp.normal_impulse = step.dt_ratio * cp.normal_impulse;
                    vcp.tangent_impulse = step.dt_ratio * cp.tangent_impulse;
                }
            }
            velocity_constraints.push(vc);

            let mut pc = PositionConstraint {
                local_points: [Vec2::ZERO; tuning::MAX_MANIFOLD_POINTS],
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                index_a: input.index_a,
                index_b: input.index_b,
                inv_mass_a: input.inv_mass_a,
                inv_mass_b: input.inv_mass_b,
                local_center_a: input.local_center_a,
                local_center_b: input.local_center_b,
                inv_i_a: input.inv_i_a,
                inv_i_b: input.inv_i_b,
                manifold_type: manifold.manifold_type,
                radius_a: input.radius_a,
                radius_b: input.radius_b,
                point_count: manifold.point_count,
            };
            for j in 0..manifold.point_count {
                pc.local_points[j] = manifold.points[j].local_point;
            }
            position_constraints.push(pc);
        }

        Self {
            velocity_constraints,
            position_constraints,
            inputs,
        }
    }

    /// Build effective masses and restitution biases from the island state.
    pub fn initialize_velocity_constraints(
        &mut self,
        positions: &[Position],
        velocities: &[Velocity],
    ) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(&self.position_constraints)
        {
            let radius_a = pc.radius_a;
            let radius_b = pc.radius_b;
            let manifold = &self.inputs[vc.contact_index].manifold;

            let index_a = vc.index_a;
            let index_b = vc.index_b;

            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;
            let local_center_a = pc.local_center_a;
            let local_center_b = pc.local_center_b;

            let c_a = positions[index_a].c;
            let a_a = positions[index_a].a;
            let v_a = velocities[index_a].v;
            let w_a = velocities[index_a].w;

            let c_b = positions[index_b].c;
            let a_b = positions[index_b].a;
            let v_b = velocities[index_b].v;
            let w_b = velocities[index_b].w;

            let q_a = Rot::from_radians(a_a);
            let q_b = Rot::from_radians(a_b);
            let xf_a = Transform {
                q: q_a,
                p: c_a - q_a.rotate_vec(local_center_a),
            };
            let xf_b = Transform {
                q: q_b,
                p: c_b - q_b.rotate_vec(local_center_b),
            };

            let world_manifold = WorldManifold::new(manifold, &xf_a, radius_a, &xf_b, radius_b);
            vc.normal = world_manifold.normal;

            let point_count = vc.point_count;
            for j in 0..point_count {
                let vcp = &mut vc.points[j];
                vcp.ra = world_manifold.points[j] - c_a;
                vcp.rb = world_manifold.points[j] - c_b;

                let rn_a = vcp.ra.cross(vc.normal);
                let rn_b = vcp.rb.cross(vc.normal);
                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let tangent = cross_scalar_vec(1.0, vc.normal);
                let rt_a = vcp.ra.cross(tangent);
                let rt_b = vcp.rb.cross(tangent);
                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                // Restitution bias from the approach speed.
                vcp.velocity_bias = 0.0;
                let v_rel = vc
                    .normal
                    .dot(v_b + cross_scalar_vec(w_b, vcp.rb) - v_a - cross_scalar_vec(w_a, vcp.ra));
                if v_rel < -tuning::VELOCITY_THRESHOLD {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            // Prepare the block solver for two-point manifolds.
            if vc.point_count == 2 {
                let vcp1 = vc.points[0];
                let vcp2 = vc.points[1];

                let rn1_a = vcp1.ra.cross(vc.normal);
                let rn1_b = vcp1.rb.cross(vc.normal);
                let rn2_a = vcp2.ra.cross(vc.normal);
                let rn2_b = vcp2.rb.cross(vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                    vc.k = Mat22::new(Vec2::new(k11, k12), Vec2::new(k12, k22));
                    vc.normal_mass = vc.k.inverse();
                } else {
                    // Nearly singular: fall back to one point.
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Apply the carried-over impulses before iterating.
    pub fn warm_start(&mut self, velocities: &mut [Velocity]) {
        for vc in &self.velocity_constraints {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;

            let mut v_a = velocities[vc.index_a].v;
            let mut w_a = velocities[vc.index_a].w;
            let mut v_b = velocities[vc.index_b].v;
            let mut w_b = velocities[vc.index_b].w;

            let normal = vc.normal;
            let tangent = cross_scalar_vec(1.0, normal);

            for vcp in vc.points.iter().take(vc.point_count) {
                let p = normal * vcp.normal_impulse + tangent * vcp.tangent_impulse;
                w_a -= i_a * vcp.ra.cross(p);
                v_a -= p * m_a;
                w_b += i_b * vcp.rb.cross(p);
                v_b += p * m_b;
            }

            velocities[vc.index_a].v = v_a;
            velocities[vc.index_a].w = w_a;
            velocities[vc.index_b].v = v_b;
            velocities[vc.index_b].w = w_b;
        }
    }

    pub fn solve_velocity_constraints(&mut self, velocities: &mut [Velocity]) {
        for vc in &mut self.velocity_constraints {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;

            let mut v_a = velocities[vc.index_a].v;
            let mut w_a = velocities[vc.index_a].w;
            let mut v_b = velocities[vc.index_b].v;
            let mut w_b = velocities[vc.index_b].w;

            let normal = vc.normal;
            let tangent = cross_scalar_vec(1.0, normal);
            let friction = vc.friction;

            debug_assert!(vc.point_count == 1 || vc.point_count == 2);

            // Tangent first, so friction clamps against the latest normal
            // impulse from the previous iteration.
            for vcp in vc.points.iter_mut().take(vc.point_count) {
                let dv = v_b + cross_scalar_vec(w_b, vcp.rb) - v_a - cross_scalar_vec(w_a, vcp.ra);

                let vt = dv.dot(tangent) - vc.tangent_speed;
                let mut lambda = vcp.tangent_mass * (-vt);

                // Accumulated clamping: |total| <= friction * normal.
                let max_friction = friction * vcp.normal_impulse;
                let new_impulse = (vcp.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = tangent * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.ra.cross(p);
                v_b += p * m_b;
                w_b += i_b * vcp.rb.cross(p);
            }

            if vc.point_count == 1 {
                let vcp = &mut vc.points[0];
                let dv = v_b + cross_scalar_vec(w_b, vcp.rb) - v_a - cross_scalar_vec(w_a, vcp.ra);

                let vn = dv.dot(normal);
                let mut lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                lambda = new_impulse - vcp.normal_impulse;
                vcp.normal_impulse = new_impulse;

                let p = normal * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.ra.cross(p);
                v_b += p * m_b;
                w_b += i_b * vcp.rb.cross(p);
            } else {
                // Block solver: solve the 2x2 LCP
                //   vn = A * x + b, vn >= 0, x >= 0, vn_i * x_i = 0
                // by enumerating the four active-set cases and taking the
                // first consistent non-negative solution.
                let cp1 = vc.points[0];
                let cp2 = vc.points[1];

                let a = Vec2::new(cp1.normal_impulse, cp2.normal_impulse);
                debug_assert!(a.x >= 0.0 && a.y >= 0.0);

                let dv1 =
                    v_b + cross_scalar_vec(w_b, cp1.rb) - v_a - cross_scalar_vec(w_a, cp1.ra);
                let dv2 =
                    v_b + cross_scalar_vec(w_b, cp2.rb) - v_a - cross_scalar_vec(w_a, cp2.ra);

                let vn1 = dv1.dot(normal);
                let vn2 = dv2.dot(normal);

                let mut b = Vec2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias);
                b -= vc.k.mul_vec(a);

                let x;
                'solve: {
                    // Case 1: both points active.
                    let candidate = -vc.normal_mass.mul_vec(b);
                    if candidate.x >= 0.0 && candidate.y >= 0.0 {
                        x = candidate;
                        break 'solve;
                    }

                    // Case 2: point 1 active, point 2 at zero.
                    //   x1 = -cp1.normalMass * b1, vn2 = k21 * x1 + b2
                    let x1 = -cp1.normal_mass * b.x;
                    let vn2 = vc.k.ex.y * x1 + b.y;
                    if x1 >= 0.0 && vn2 >= 0.0 {
                        x = Vec2::new(x1, 0.0);
                        break 'solve;
                    }

                    // Case 3: point 2 active, point 1 at zero.
                    let x2 = -cp2.normal_mass * b.y;
                    let vn1 = vc.k.ey.x * x2 + b.x;
                    if x2 >= 0.0 && vn1 >= 0.0 {
                        x = Vec2::new(0.0, x2);
                        break 'solve;
                    }

                    // Case 4: both points inactive.
                    if b.x >= 0.0 && b.y >= 0.0 {
                        x = Vec2::ZERO;
                        break 'solve;
                    }

                    // No consistent case (can happen with poor conditioning);
                    // keep the accumulated impulses.
                    x = a;
                }

                let d = x - a;

                let p1 = normal * d.x;
                let p2 = normal * d.y;
                v_a -= (p1 + p2) * m_a;
                w_a -= i_a * (cp1.ra.cross(p1) + cp2.ra.cross(p2));
                v_b += (p1 + p2) * m_b;
                w_b += i_b * (cp1.rb.cross(p1) + cp2.rb.cross(p2));

                vc.points[0].normal_impulse = x.x;
                vc.points[1].normal_impulse = x.y;
            }

            velocities[vc.index_a].v = v_a;
            velocities[vc.index_a].w = w_a;
            velocities[vc.index_b].v = v_b;
            velocities[vc.index_b].w = w_b;
        }
    }

    /// Write accumulated impulses back to the contact manifolds for the next
    /// step's warm start.
    pub fn store_impulses(&self, contacts: &mut Slab<Contact>) {
        for vc in &self.velocity_constraints {
            let input = &self.inputs[vc.contact_index];
            let manifold = &mut contacts[input.contact.0].manifold;
            for j in 0..vc.point_count {
                manifold.points[j].normal_impulse = vc.points[j].normal_impulse;
                manifold.points[j].tangent_impulse = vc.points[j].tangent_impulse;
            }
        }
    }

    /// Impulses of one constraint, for post-solve reporting.
    pub fn impulses(&self, index: usize) -> (ContactId, crate::events::ContactImpulse) {
        let vc = &self.velocity_constraints[index];
        let mut impulse = crate::events::ContactImpulse {
            count: vc.point_count,
            ..Default::default()
        };
        for j in 0..vc.point_count {
            impulse.normal_impulses[j] = vc.points[j].normal_impulse;
            impulse.tangent_impulses[j] = vc.points[j].tangent_impulse;
        }
        (self.inputs[vc.contact_index].contact, impulse)
    }

    pub fn constraint_count(&self) -> usize {
        self.velocity_constraints.len()
    }

    /// Discrete-step position correction. Returns true when the worst
    /// separation is within tolerance.
    pub fn solve_position_constraints(&self, positions: &mut [Position]) -> bool {
        self.solve_position_constraints_inner(positions, None)
    }

    /// TOI position correction: only the two TOI bodies move, with a stiffer
    /// Baumgarte factor.
    pub fn solve_toi_position_constraints(
        &self,
        positions: &mut [Position],
        toi_index_a: usize,
        toi_index_b: usize,
    ) -> bool {
        self.solve_position_constraints_inner(positions, Some((toi_index_a, toi_index_b)))
    }

    fn solve_position_constraints_inner(
        &self,
        positions: &mut [Position],
        toi_indices: Option<(usize, usize)>,
    ) -> bool {
        let mut min_separation = 0.0f32;

        for pc in &self.position_constraints {
            let index_a = pc.index_a;
            let index_b = pc.index_b;
            let local_center_a = pc.local_center_a;
            let local_center_b = pc.local_center_b;

            let (m_a, i_a, m_b, i_b) = match toi_indices {
                None => (pc.inv_mass_a, pc.inv_i_a, pc.inv_mass_b, pc.inv_i_b),
                Some((toi_a, toi_b)) => {
                    // Bodies dragged into the TOI island are treated as
                    // infinitely heavy so only the TOI pair is corrected.
                    let movable_a = index_a == toi_a || index_a == toi_b;
                    let movable_b = index_b == toi_a || index_b == toi_b;
                    (
                        if movable_a { pc.inv_mass_a } else { 0.0 },
                        if movable_a { pc.inv_i_a } else { 0.0 },
                        if movable_b { pc.inv_mass_b } else { 0.0 },
                        if movable_b { pc.inv_i_b } else { 0.0 },
                    )
                }
            };

            let mut c_a = positions[index_a].c;
            let mut a_a = positions[index_a].a;
            let mut c_b = positions[index_b].c;
            let mut a_b = positions[index_b].a;

            for j in 0..pc.point_count {
                let q_a = Rot::from_radians(a_a);
                let q_b = Rot::from_radians(a_b);
                let xf_a = Transform {
                    q: q_a,
                    p: c_a - q_a.rotate_vec(local_center_a),
                };
                let xf_b = Transform {
                    q: q_b,
                    p: c_b - q_b.rotate_vec(local_center_b),
                };

                let (normal, point, separation) = position_solver_manifold(pc, &xf_a, &xf_b, j);

                let ra = point - c_a;
                let rb = point - c_b;

                min_separation = min_separation.min(separation);

                let baumgarte = if toi_indices.is_some() {
                    tuning::TOI_BAUMGARTE
                } else {
                    tuning::BAUMGARTE
                };
                let correction = (baumgarte * (separation + tuning::LINEAR_SLOP))
                    .clamp(-tuning::MAX_LINEAR_CORRECTION, 0.0);

                let rn_a = ra.cross(normal);
                let rn_b = rb.cross(normal);
                let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;

                let impulse = if k > 0.0 { -correction / k } else { 0.0 };
                let p = normal * impulse;

                c_a -= p * m_a;
                a_a -= i_a * ra.cross(p);
                c_b += p * m_b;
                a_b += i_b * rb.cross(p);
            }

            positions[index_a].c = c_a;
            positions[index_a].a = a_a;
            positions[index_b].c = c_b;
            positions[index_b].a = a_b;
        }

        // Can't expect min_separation >= -LINEAR_SLOP because the slop is
        // not pushed out; the threshold leaves headroom for accumulation.
        if toi_indices.is_some() {
            min_separation >= -1.5 * tuning::LINEAR_SLOP
        } else {
            min_separation >= -3.0 * tuning::LINEAR_SLOP
        }
    }
}

/// Normal, world point, and separation of one manifold point under the given
/// trial transforms.
fn position_solver_manifold(
    pc: &PositionConstraint,
    xf_a: &Transform,
    xf_b: &Transform,
    index: usize,
) -> (Vec2, Vec2, f32) {
    debug_assert!(pc.point_count > 0);

    match pc.manifold_type {
        ManifoldType::Circles => {
            let point_a = xf_a.transform_point(pc.local_point);
            let point_b = xf_b.transform_point(pc.local_points[0]);
            let normal = (point_b - point_a).normalized();
            let point = (point_a + point_b) * 0.5;
            let separation = (point_b - point_a).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, point, separation)
        }
        ManifoldType::FaceA => {
            let normal = xf_a.q.rotate_vec(pc.local_normal);
            let plane_point = xf_a.transform_point(pc.local_point);
            let clip_point = xf_b.transform_point(pc.local_points[index]);
            let separation = (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, clip_point, separation)
        }
        ManifoldType::FaceB => {
            let normal = xf_b.q.rotate_vec(pc.local_normal);
            let plane_point = xf_b.transform_point(pc.local_point);
            let clip_point = xf_a.transform_point(pc.local_points[index]);
            let separation = (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            // Flip so the normal points from A to B.
            (-normal, clip_point, separation)
        }
    }
}
