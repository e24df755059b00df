//! Persistent contacts.
//!
//! A contact exists for every fixture pair whose fat AABBs overlap and whose
//! filters allow collision; it is not necessarily touching. Each step the
//! contact re-evaluates its manifold and carries impulses over from points
//! whose feature ids survived.

use bitflags::bitflags;

use crate::collision::manifold::{Manifold, WorldManifold};
use crate::collision::{collide_circle, collide_edge, collide_polygon, test_overlap};
use crate::core::math::Transform;
use crate::shapes::{Shape, ShapeType};
use crate::types::FixtureId;

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub(crate) struct ContactFlags: u32 {
        const ISLAND = 0x0001;
        const TOUCHING = 0x0002;
        const ENABLED = 0x0004;
        const FILTER = 0x0008;
        const BULLET_HIT = 0x0010;
        const TOI = 0x0020;
    }
}

#[inline]
fn mix_friction(friction1: f32, friction2: f32) -> f32 {
    (friction1 * friction2).sqrt()
}

#[inline]
fn mix_restitution(restitution1: f32, restitution2: f32) -> f32 {
    restitution1.max(restitution2)
}

/// True when the ordered pair `(a, b)` has a collide routine; otherwise the
/// fixtures must be swapped at creation time.
pub(crate) fn has_collide_routine(a: ShapeType, b: ShapeType) -> bool {
    matches!(
        (a, b),
        (ShapeType::Circle, ShapeType::Circle)
            | (ShapeType::Polygon, ShapeType::Circle)
            | (ShapeType::Polygon, ShapeType::Polygon)
            | (ShapeType::Edge, ShapeType::Circle)
            | (ShapeType::Edge, ShapeType::Polygon)
            | (ShapeType::Chain, ShapeType::Circle)
            | (ShapeType::Chain, ShapeType::Polygon)
    )
}

/// Outcome of a manifold update, consumed by the contact manager to fire
/// listener events.
pub(crate) struct ContactUpdateResult {
    pub began: bool,
    pub ended: bool,
    pub run_pre_solve: bool,
    pub touching_changed: bool,
    pub old_manifold: Manifold,
}

/// A persistent record connecting two fixture children.
#[derive(Clone, Debug)]
pub struct Contact {
    pub(crate) flags: ContactFlags,
    pub(crate) fixture_a: FixtureId,
    pub(crate) fixture_b: FixtureId,
    pub(crate) child_a: usize,
    pub(crate) child_b: usize,
    pub(crate) manifold: Manifold,
    pub(crate) toi_count: usize,
    pub(crate) toi: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) tangent_speed: f32,
}

impl Contact {
    pub(crate) fn new(
        fixture_a: FixtureId,
        child_a: usize,
        fixture_b: FixtureId,
        child_b: usize,
        friction_a: f32,
        friction_b: f32,
        restitution_a: f32,
        restitution_b: f32,
    ) -> Contact {
        Contact {
            flags: ContactFlags::ENABLED,
            fixture_a,
            fixture_b,
            child_a,
            child_b,
            manifold: Manifold::default(),
            toi_count: 0,
            toi: 1.0,
            friction: mix_friction(friction_a, friction_b),
            restitution: mix_restitution(restitution_a, restitution_b),
            tangent_speed: 0.0,
        }
    }

    pub fn fixture_a(&self) -> FixtureId {
        self.fixture_a
    }

    pub fn fixture_b(&self) -> FixtureId {
        self.fixture_b
    }

    pub fn child_index_a(&self) -> usize {
        self.child_a
    }

    pub fn child_index_b(&self) -> usize {
        self.child_b
    }

    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    pub fn is_touching(&self) -> bool {
        self.flags.contains(ContactFlags::TOUCHING)
    }

    /// Enable or disable this contact for the current step only; the flag is
    /// re-set on the next update. Meant for [`ContactListener::pre_solve`].
    ///
    /// [`ContactListener::pre_solve`]: crate::events::ContactListener::pre_solve
    pub fn set_enabled(&mut self, flag: bool) {
        self.flags.set(ContactFlags::ENABLED, flag);
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(ContactFlags::ENABLED)
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    pub fn reset_friction(&mut self, friction_a: f32, friction_b: f32) {
        self.friction = mix_friction(friction_a, friction_b);
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    pub fn reset_restitution(&mut self, restitution_a: f32, restitution_b: f32) {
        self.restitution = mix_restitution(restitution_a, restitution_b);
    }

    /// Conveyor-belt style surface speed along the tangent.
    pub fn tangent_speed(&self) -> f32 {
        self.tangent_speed
    }

    pub fn set_tangent_speed(&mut self, speed: f32) {
        self.tangent_speed = speed;
    }

    /// Mark for filter re-evaluation on the next contact manager pass.
    pub(crate) fn flag_for_filtering(&mut self) {
        self.flags.insert(ContactFlags::FILTER);
    }

    /// World-space view of the current manifold.
    pub fn world_manifold(
        &self,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> WorldManifold {
        WorldManifold::new(&self.manifold, xf_a, radius_a, xf_b, radius_b)
    }

    /// Evaluate the manifold for the current shape poses. The dispatch is
    /// fixed at creation: shape A's type is Edge/Chain/Polygon-major per
    /// [`has_collide_routine`].
    pub(crate) fn evaluate(
        &mut self,
        shape_a: &Shape,
        shape_b: &Shape,
        xf_a: &Transform,
        xf_b: &Transform,
    ) {
        match (shape_a, shape_b) {
            (Shape::Circle(a), Shape::Circle(b)) => {
                collide_circle::collide_circles(&mut self.manifold, a, xf_a, b, xf_b)
            }
            (Shape::Polygon(a), Shape::Circle(b)) => {
                collide_circle::collide_polygon_and_circle(&mut self.manifold, a, xf_a, b, xf_b)
            }
            (Shape::Polygon(a), Shape::Polygon(b)) => {
                collide_polygon::collide_polygons(&mut self.manifold, a, xf_a, b, xf_b)
            }
            (Shape::Edge(a), Shape::Circle(b)) => {
                collide_edge::collide_edge_and_circle(&mut self.manifold, a, xf_a, b, xf_b)
            }
            (Shape::Edge(a), Shape::Polygon(b)) => {
                collide_edge::collide_edge_and_polygon(&mut self.manifold, a, xf_a, b, xf_b)
            }
            (Shape::Chain(a), Shape::Circle(b)) => {
                let edge = a.child_edge(self.child_a);
                collide_edge::collide_edge_and_circle(&mut self.manifold, &edge, xf_a, b, xf_b)
            }
            (Shape::Chain(a), Shape::Polygon(b)) => {
                let edge = a.child_edge(self.child_a);
                collide_edge::collide_edge_and_polygon(&mut self.manifold, &edge, xf_a, b, xf_b)
            }
            _ => {
                debug_assert!(false, "no collide routine for this shape pair");
                self.manifold.point_count = 0;
            }
        }
    }

    /// Recompute the manifold, preserve matching impulses, and update the
    /// touching state. Sensors use an exact overlap test and keep an empty
    /// manifold.
    pub(crate) fn update(
        &mut self,
        shape_a: &Shape,
        shape_b: &Shape,
        xf_a: &Transform,
        xf_b: &Transform,
        sensor: bool,
    ) -> ContactUpdateResult {
        let old_manifold = self.manifold;

        // Re-enable; pre_solve may disable again this step.
        self.flags.insert(ContactFlags::ENABLED);

        let was_touching = self.flags.contains(ContactFlags::TOUCHING);
        let touching;

        if sensor {
            touching = test_overlap(shape_a, self.child_a, shape_b, self.child_b, *xf_a, *xf_b);
            self.manifold.point_count = 0;
        } else {
            self.evaluate(shape_a, shape_b, xf_a, xf_b);
            touching = self.manifold.point_count > 0;

            // Match old points by feature id to carry impulses over.
            for i in 0..self.manifold.point_count {
                let mp2 = &mut self.manifold.points[i];
                mp2.normal_impulse = 0.0;
                mp2.tangent_impulse = 0.0;
                for j in 0..old_manifold.point_count {
                    let mp1 = &old_manifold.points[j];
                    if mp1.id == mp2.id {
                        mp2.normal_impulse = mp1.normal_impulse;
                        mp2.tangent_impulse = mp1.tangent_impulse;
                        break;
                    }
                }
            }
        }

        self.flags.set(ContactFlags::TOUCHING, touching);

        ContactUpdateResult {
            began: !was_touching && touching,
            ended: was_touching && !touching,
            run_pre_solve: !sensor && touching,
            touching_changed: touching != was_touching,
            old_manifold,
        }
    }
}
