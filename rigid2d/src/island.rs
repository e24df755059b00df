//! Islands: connected components of awake dynamic bodies linked by touching
//! contacts and active joints, solved as one unit.

use slab::Slab;

use crate::body::{Body, BodyFlags, BodyType};
use crate::contact::Contact;
use crate::contact_solver::{ContactSolver, ContactSolverInput};
use crate::events::ContactListener;
use crate::fixture::Fixture;
use crate::joints::Joint;
use crate::time_step::{Position, SolverData, TimeStep, Velocity};
use crate::tuning;
use crate::types::{BodyId, ContactId, JointId, Vec2};

/// Transient island scratch, reused across a step.
pub(crate) struct Island {
    pub bodies: Vec<BodyId>,
    pub contacts: Vec<ContactId>,
    pub joints: Vec<JointId>,
    positions: Vec<Position>,
    velocities: Vec<Velocity>,
}

impl Island {
    pub fn new(body_capacity: usize, contact_capacity: usize, joint_capacity: usize) -> Self {
        Self {
            bodies: Vec::with_capacity(body_capacity),
            contacts: Vec::with_capacity(contact_capacity),
            joints: Vec::with_capacity(joint_capacity),
            positions: Vec::with_capacity(body_capacity),
            velocities: Vec::with_capacity(body_capacity),
        }
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }

    pub fn add_body(&mut self, id: BodyId, bodies: &mut Slab<Body>) {
        bodies[id.0].island_index = self.bodies.len();
        self.bodies.push(id);
    }

    pub fn add_contact(&mut self, id: ContactId) {
        self.contacts.push(id);
    }

    pub fn add_joint(&mut self, id: JointId) {
        self.joints.push(id);
    }

    fn gather_contact_inputs(
        &self,
        bodies: &Slab<Body>,
        fixtures: &Slab<Fixture>,
        contacts: &Slab<Contact>,
    ) -> Vec<ContactSolverInput> {
        self.contacts
            .iter()
            .map(|&id| {
                let contact = &contacts[id.0];
                let fixture_a = &fixtures[contact.fixture_a().0];
                let fixture_b = &fixtures[contact.fixture_b().0];
                let body_a = &bodies[fixture_a.body().0];
                let body_b = &bodies[fixture_b.body().0];
                ContactSolverInput {
                    contact: id,
                    manifold: *contact.manifold(),
                    index_a: body_a.island_index,
                    index_b: body_b.island_index,
                    inv_mass_a: body_a.inv_mass,
                    inv_mass_b: body_b.inv_mass,
                    inv_i_a: body_a.inv_inertia,
                    inv_i_b: body_b.inv_inertia,
                    local_center_a: body_a.sweep.local_center,
                    local_center_b: body_b.sweep.local_center,
                    radius_a: fixture_a.shape().radius(),
                    radius_b: fixture_b.shape().radius(),
                    friction: contact.friction(),
                    restitution: contact.restitution(),
                    tangent_speed: contact.tangent_speed(),
                }
            })
            .collect()
    }

    /// Discrete solve: integrate velocities, run the velocity and position
    /// solvers, write results back, report impulses, and apply the sleep
    /// policy.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        step: &TimeStep,
        gravity: Vec2,
        allow_sleep: bool,
        bodies: &mut Slab<Body>,
        fixtures: &Slab<Fixture>,
        contacts: &mut Slab<Contact>,
        joints: &mut Slab<Joint>,
        listener: &mut Option<Box<dyn ContactListener>>,
    ) {
        let h = step.dt;

        // Integrate velocities and stash the island state.
        self.positions.clear();
        self.velocities.clear();
        for &id in &self.bodies {
            let body = &mut bodies[id.0];

            let c = body.sweep.c;
            let a = body.sweep.a;
            let mut v = body.linear_velocity;
            let mut w = body.angular_velocity;

            // Store positions for continuous collision.
            body.sweep.c0 = body.sweep.c;
            body.sweep.a0 = body.sweep.a;

            if body.body_type == BodyType::Dynamic {
                let gravity_term = if body.flags.contains(BodyFlags::IGNORE_GRAVITY) {
                    Vec2::ZERO
                } else {
                    gravity * body.gravity_scale
                };
                v += (gravity_term + body.force * body.inv_mass) * h;
                w += h * body.inv_inertia * body.torque;

                // Apply damping via the implicit-friendly approximation
                // v2 = v1 * 1 / (1 + c * dt).
                v *= 1.0 / (1.0 + h * body.linear_damping);
                w *= 1.0 / (1.0 + h * body.angular_damping);
            }

            self.positions.push(Position { c, a });
            self.velocities.push(Velocity { v, w });
        }

        let inputs = self.gather_contact_inputs(bodies, fixtures, contacts);
        let mut contact_solver = ContactSolver::new(step, inputs);
        contact_solver.initialize_velocity_constraints(&self.positions, &self.velocities);
        if step.warm_starting {
            contact_solver.warm_start(&mut self.velocities);
        }

        {
            let mut data = SolverData {
                step: *step,
                positions: &mut self.positions,
                velocities: &mut self.velocities,
            };
            for &id in &self.joints {
                joints[id.0].init_velocity_constraints(&mut data, bodies);
            }

            for _ in 0..step.velocity_iterations {
                for &id in &self.joints {
                    joints[id.0].solve_velocity_constraints(&mut data);
                }
                contact_solver.solve_velocity_constraints(data.velocities);
            }
        }

        // Store impulses for warm starting.
        contact_solver.store_impulses(contacts);

        // Integrate positions with translation/rotation clamps.
        for i in 0..self.bodies.len() {
            let mut c = self.positions[i].c;
            let mut a = self.positions[i].a;
            let mut v = self.velocities[i].v;
            let mut w = self.velocities[i].w;

            let translation = v * h;
            if translation.dot(translation) > tuning::MAX_TRANSLATION_SQUARED {
                let ratio = tuning::MAX_TRANSLATION / translation.length();
                v *= ratio;
            }

            let rotation = h * w;
            if rotation * rotation > tuning::MAX_ROTATION_SQUARED {
                let ratio = tuning::MAX_ROTATION / rotation.abs();
                w *= ratio;
            }

            c += v * h;
            a += h * w;

            self.positions[i] = Position { c, a };
            self.velocities[i] = Velocity { v, w };
        }

        // Position solve.
        let mut position_solved = false;
        for _ in 0..step.position_iterations {
            let contacts_okay = contact_solver.solve_position_constraints(&mut self.positions);

            let mut joints_okay = true;
            {
                let mut data = SolverData {
                    step: *step,
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                };
                for &id in &self.joints {
                    let joint_okay = joints[id.0].solve_position_constraints(&mut data);
                    joints_okay = joints_okay && joint_okay;
                }
            }

            if contacts_okay && joints_okay {
                // Exit early if the position errors are small.
                position_solved = true;
                break;
            }
        }

        // Copy state back to the bodies.
        for (i, &id) in self.bodies.iter().enumerate() {
            let body = &mut bodies[id.0];
            body.sweep.c = self.positions[i].c;
            body.sweep.a = self.positions[i].a;
            body.linear_velocity = self.velocities[i].v;
            body.angular_velocity = self.velocities[i].w;
            body.synchronize_transform();
        }

        self.report(&contact_solver, contacts, listener);

        if allow_sleep {
            let mut min_sleep_time = f32::MAX;

            let lin_tol_sqr = tuning::LINEAR_SLEEP_TOLERANCE * tuning::LINEAR_SLEEP_TOLERANCE;
            let ang_tol_sqr = tuning::ANGULAR_SLEEP_TOLERANCE * tuning::ANGULAR_SLEEP_TOLERANCE;

            for &id in &self.bodies {
                let body = &mut bodies[id.0];
                if body.body_type == BodyType::Static {
                    continue;
                }

                if !body.flags.contains(BodyFlags::AUTO_SLEEP)
                    || body.angular_velocity * body.angular_velocity > ang_tol_sqr
                    || body.linear_velocity.dot(body.linear_velocity) > lin_tol_sqr
                {
                    body.sleep_time = 0.0;
                    min_sleep_time = 0.0;
                } else {
                    body.sleep_time += h;
                    min_sleep_time = min_sleep_time.min(body.sleep_time);
                }
            }

            // The whole island shares the sleep decision.
            if min_sleep_time >= tuning::TIME_TO_SLEEP && position_solved {
                for &id in &self.bodies {
                    bodies[id.0].set_awake(false);
                }
            }
        }
    }

    /// TOI sub-step solve: position-only resolution at the impact time, then
    /// a velocity pass over the remaining fraction. No warm starting; the
    /// impulses are small and transient.
    #[allow(clippy::too_many_arguments)]
    pub fn solve_toi(
        &mut self,
        sub_step: &TimeStep,
        toi_index_a: usize,
        toi_index_b: usize,
        bodies: &mut Slab<Body>,
        fixtures: &Slab<Fixture>,
        contacts: &mut Slab<Contact>,
        listener: &mut Option<Box<dyn ContactListener>>,
    ) {
        debug_assert!(toi_index_a < self.bodies.len());
        debug_assert!(toi_index_b < self.bodies.len());

        self.positions.clear();
        self.velocities.clear();
        for &id in &self.bodies {
            let body = &bodies[id.0];
            self.positions.push(Position {
                c: body.sweep.c,
                a: body.sweep.a,
            });
            self.velocities.push(Velocity {
                v: body.linear_velocity,
                w: body.angular_velocity,
            });
        }

        let inputs = self.gather_contact_inputs(bodies, fixtures, contacts);
        let mut contact_solver = ContactSolver::new(sub_step, inputs);

        // Resolve penetration at the impact time.
        for _ in 0..sub_step.position_iterations {
            if contact_solver.solve_toi_position_constraints(
                &mut self.positions,
                toi_index_a,
                toi_index_b,
            ) {
                break;
            }
        }

        // The TOI pair's advanced poses become the new sweep baselines, so
        // the discrete solver continues from the impact configuration.
        bodies[self.bodies[toi_index_a].0].sweep.c0 = self.positions[toi_index_a].c;
        bodies[self.bodies[toi_index_a].0].sweep.a0 = self.positions[toi_index_a].a;
        bodies[self.bodies[toi_index_b].0].sweep.c0 = self.positions[toi_index_b].c;
        bodies[self.bodies[toi_index_b].0].sweep.a0 = self.positions[toi_index_b].a;

        // No warm starting needed; contacts were updated just above.
        contact_solver.initialize_velocity_constraints(&self.positions, &self.velocities);

        for _ in 0..sub_step.velocity_iterations {
            contact_solver.solve_velocity_constraints(&mut self.velocities);
        }

        // Leave impulses for the discrete solver's warm start.
        contact_solver.store_impulses(contacts);

        // Integrate the remaining portion of the step.
        let h = sub_step.dt;
        for (i, &id) in self.bodies.iter().enumerate() {
            let mut c = self.positions[i].c;
            let mut a = self.positions[i].a;
            let mut v = self.velocities[i].v;
            let mut w = self.velocities[i].w;

            let translation = v * h;
            if translation.dot(translation) > tuning::MAX_TRANSLATION_SQUARED {
                let ratio = tuning::MAX_TRANSLATION / translation.length();
                v *= ratio;
            }
            let rotation = h * w;
            if rotation * rotation > tuning::MAX_ROTATION_SQUARED {
                let ratio = tuning::MAX_ROTATION / rotation.abs();
                w *= ratio;
            }

            c += v * h;
            a += h * w;

            let body = &mut bodies[id.0];
            body.sweep.c = c;
            body.sweep.a = a;
            body.linear_velocity = v;
            body.angular_velocity = w;
            body.synchronize_transform();
        }

        self.report(&contact_solver, contacts, listener);
    }

    fn report(
        &self,
        solver: &ContactSolver,
        contacts: &mut Slab<Contact>,
        listener: &mut Option<Box<dyn ContactListener>>,
    ) {
        let Some(listener) = listener.as_mut() else {
            return;
        };
        for i in 0..solver.constraint_count() {
            let (contact_id, impulse) = solver.impulses(i);
            listener.post_solve(&mut contacts[contact_id.0], &impulse);
        }
    }
}
