//! User callbacks fired during a world step.
//!
//! Callbacks run synchronously inside `World::step`; the world is locked for
//! their duration, so they must not create or destroy bodies, fixtures, or
//! joints. Record what happened and act after the step returns.

use crate::contact::Contact;
use crate::collision::Manifold;
use crate::fixture::Fixture;
use crate::tuning;

/// Per-point impulses applied by the contact solver, reported to
/// [`ContactListener::post_solve`]. Useful for breaking or damaging things.
#[derive(Copy, Clone, Debug, Default)]
pub struct ContactImpulse {
    pub normal_impulses: [f32; tuning::MAX_MANIFOLD_POINTS],
    pub tangent_impulses: [f32; tuning::MAX_MANIFOLD_POINTS],
    pub count: usize,
}

/// Contact lifecycle events.
pub trait ContactListener {
    /// Two fixtures began touching.
    fn begin_contact(&mut self, _contact: &mut Contact) {}
    /// Two fixtures stopped touching.
    fn end_contact(&mut self, _contact: &mut Contact) {}
    /// Fires after the manifold update and before the solver. Disable the
    /// contact here to skip it for this step only.
    fn pre_solve(&mut self, _contact: &mut Contact, _old_manifold: &Manifold) {}
    /// Fires once per touching contact after the velocity solver.
    fn post_solve(&mut self, _contact: &mut Contact, _impulse: &ContactImpulse) {}
}

/// Veto hook consulted before a contact is created.
pub trait ContactFilter {
    fn should_collide(&self, fixture_a: &Fixture, fixture_b: &Fixture) -> bool;
}

/// Category/mask/group filtering only.
#[derive(Default)]
pub struct DefaultContactFilter;

impl ContactFilter for DefaultContactFilter {
    fn should_collide(&self, fixture_a: &Fixture, fixture_b: &Fixture) -> bool {
        fixture_a.filter().should_collide(fixture_b.filter())
    }
}
