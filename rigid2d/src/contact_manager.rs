//! Contact lifecycle: creation from broad-phase pairs, narrow-phase updates,
//! and destruction on separation or filter change.

use slab::Slab;

use crate::body::{Body, BodyType, ContactEdge};
use crate::collision::broad_phase::BroadPhase;
use crate::contact::{has_collide_routine, Contact, ContactFlags};
use crate::events::{ContactFilter, ContactListener, DefaultContactFilter};
use crate::fixture::{Fixture, FixtureProxy};
use crate::joints::Joint;
use crate::types::{ContactId, Vec2};

pub(crate) struct ContactManager {
    pub broad_phase: BroadPhase<FixtureProxy>,
    pub contacts: Slab<Contact>,
    pub contact_filter: Box<dyn ContactFilter>,
    pub listener: Option<Box<dyn ContactListener>>,
}

impl ContactManager {
    pub fn new() -> Self {
        Self {
            broad_phase: BroadPhase::new(),
            contacts: Slab::new(),
            contact_filter: Box::new(DefaultContactFilter),
            listener: None,
        }
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn contact_ids(&self) -> Vec<ContactId> {
        self.contacts.iter().map(|(k, _)| ContactId(k)).collect()
    }

    /// Pull move pairs from the broad-phase and create contacts for new
    /// admissible pairs.
    pub fn find_new_contacts(
        &mut self,
        bodies: &mut Slab<Body>,
        fixtures: &Slab<Fixture>,
        joints: &Slab<Joint>,
    ) {
        let Self {
            broad_phase,
            contacts,
            contact_filter,
            ..
        } = self;

        broad_phase.update_pairs(|proxy_a: FixtureProxy, proxy_b: FixtureProxy| {
            let fixture_a = &fixtures[proxy_a.fixture.0];
            let fixture_b = &fixtures[proxy_b.fixture.0];
            let body_a_id = fixture_a.body();
            let body_b_id = fixture_b.body();

            // Fixtures on the same body never collide.
            if body_a_id == body_b_id {
                return;
            }

            // Does a contact already exist for this child pair?
            for edge in &bodies[body_b_id.0].contact_edges {
                if edge.other != body_a_id {
                    continue;
                }
                let existing = &contacts[edge.contact.0];
                let fa = existing.fixture_a();
                let fb = existing.fixture_b();
                let ca = existing.child_index_a();
                let cb = existing.child_index_b();
                if fa == proxy_a.fixture && fb == proxy_b.fixture && ca == proxy_a.child && cb == proxy_b.child {
                    return;
                }
                if fa == proxy_b.fixture && fb == proxy_a.fixture && ca == proxy_b.child && cb == proxy_a.child {
                    return;
                }
            }

            {
                let body_a = &bodies[body_a_id.0];
                let body_b = &bodies[body_b_id.0];

                // At least one body must be dynamic, and both enabled.
                if body_a.body_type() != BodyType::Dynamic
                    && body_b.body_type() != BodyType::Dynamic
                {
                    return;
                }
                if !body_a.is_enabled() || !body_b.is_enabled() {
                    return;
                }
                // A connecting joint may veto collision.
                if !body_b.should_collide_connected(body_a_id, |jid| {
                    joints[jid.0].collide_connected()
                }) {
                    return;
                }
            }

            if !contact_filter.should_collide(fixture_a, fixture_b) {
                return;
            }

            // Order the pair so a collide routine exists for it. Pairs with
            // no routine (edge vs edge, chain vs chain) never collide.
            let type_a = fixture_a.shape().shape_type();
            let type_b = fixture_b.shape().shape_type();
            let (pa, pb) = if has_collide_routine(type_a, type_b) {
                (proxy_a, proxy_b)
            } else if has_collide_routine(type_b, type_a) {
                (proxy_b, proxy_a)
            } else {
                return;
            };
            let fa = &fixtures[pa.fixture.0];
            let fb = &fixtures[pb.fixture.0];

            let key = contacts.insert(Contact::new(
                pa.fixture,
                pa.child,
                pb.fixture,
                pb.child,
                fa.friction(),
                fb.friction(),
                fa.restitution(),
                fb.restitution(),
            ));
            let contact = ContactId(key);

            bodies[fa.body().0].contact_edges.push(ContactEdge {
                other: fb.body(),
                contact,
            });
            bodies[fb.body().0].contact_edges.push(ContactEdge {
                other: fa.body(),
                contact,
            });
        });
    }

    /// Narrow phase over every contact: drop stale pairs, re-evaluate
    /// manifolds, and fire begin/end/pre-solve events.
    pub fn collide(
        &mut self,
        bodies: &mut Slab<Body>,
        fixtures: &Slab<Fixture>,
        joints: &Slab<Joint>,
    ) {
        let ids = self.contact_ids();
        for id in ids {
            let (fixture_a_id, fixture_b_id, child_a, child_b, filter_flagged) = {
                let c = &self.contacts[id.0];
                (
                    c.fixture_a(),
                    c.fixture_b(),
                    c.child_index_a(),
                    c.child_index_b(),
                    c.flags.contains(ContactFlags::FILTER),
                )
            };
            let body_a_id = fixtures[fixture_a_id.0].body();
            let body_b_id = fixtures[fixture_b_id.0].body();

            // A filter change can kill the contact.
            if filter_flagged {
                let joint_veto = !bodies[body_b_id.0].should_collide_connected(body_a_id, |jid| {
                    joints[jid.0].collide_connected()
                });
                let filter_veto = {
                    let fixture_a = &fixtures[fixture_a_id.0];
                    let fixture_b = &fixtures[fixture_b_id.0];
                    !self.contact_filter.should_collide(fixture_a, fixture_b)
                };
                if joint_veto || filter_veto {
                    self.destroy(id, bodies, fixtures);
                    continue;
                }
                self.contacts[id.0].flags.remove(ContactFlags::FILTER);
            }

            let active_a = bodies[body_a_id.0].is_awake()
                && bodies[body_a_id.0].body_type() != BodyType::Static;
            let active_b = bodies[body_b_id.0].is_awake()
                && bodies[body_b_id.0].body_type() != BodyType::Static;

            // At least one body must be awake; sleeping pairs keep their state.
            if !active_a && !active_b {
                continue;
            }

            // The pair persists only while the fat AABBs overlap.
            let overlap = {
                let fa = &fixtures[fixture_a_id.0];
                let fb = &fixtures[fixture_b_id.0];
                fa.proxy_aabb(&self.broad_phase, child_a)
                    .overlaps(&fb.proxy_aabb(&self.broad_phase, child_b))
            };
            if !overlap {
                self.destroy(id, bodies, fixtures);
                continue;
            }

            self.update_contact(id, bodies, fixtures);
        }
    }

    /// Run `Contact::update` and dispatch the resulting events.
    pub fn update_contact(
        &mut self,
        id: ContactId,
        bodies: &mut Slab<Body>,
        fixtures: &Slab<Fixture>,
    ) {
        let contact = &mut self.contacts[id.0];
        let fixture_a = &fixtures[contact.fixture_a().0];
        let fixture_b = &fixtures[contact.fixture_b().0];
        let body_a_id = fixture_a.body();
        let body_b_id = fixture_b.body();
        let sensor = fixture_a.is_sensor() || fixture_b.is_sensor();

        let xf_a = *bodies[body_a_id.0].transform();
        let xf_b = *bodies[body_b_id.0].transform();

        let result = contact.update(fixture_a.shape(), fixture_b.shape(), &xf_a, &xf_b, sensor);

        if !sensor && result.touching_changed {
            bodies[body_a_id.0].set_awake(true);
            bodies[body_b_id.0].set_awake(true);
        }

        if let Some(listener) = self.listener.as_mut() {
            let contact = &mut self.contacts[id.0];
            if result.began {
                listener.begin_contact(contact);
            }
            if result.ended {
                listener.end_contact(contact);
            }
            if result.run_pre_solve {
                listener.pre_solve(contact, &result.old_manifold);
            }
        }
    }

    /// Unlink and drop a contact. Fires `end_contact` when it was touching,
    /// and wakes both bodies when a solid manifold disappears.
    pub fn destroy(&mut self, id: ContactId, bodies: &mut Slab<Body>, fixtures: &Slab<Fixture>) {
        let (fixture_a_id, fixture_b_id, touching, point_count) = {
            let c = &self.contacts[id.0];
            (
                c.fixture_a(),
                c.fixture_b(),
                c.is_touching(),
                c.manifold().point_count,
            )
        };
        let body_a_id = fixtures[fixture_a_id.0].body();
        let body_b_id = fixtures[fixture_b_id.0].body();
        let sensor = fixtures[fixture_a_id.0].is_sensor() || fixtures[fixture_b_id.0].is_sensor();

        if touching {
            if let Some(listener) = self.listener.as_mut() {
                listener.end_contact(&mut self.contacts[id.0]);
            }
        }

        bodies[body_a_id.0].remove_contact_edge(id);
        bodies[body_b_id.0].remove_contact_edge(id);

        if point_count > 0 && !sensor {
            bodies[body_a_id.0].set_awake(true);
            bodies[body_b_id.0].set_awake(true);
        }

        self.contacts.remove(id.0);
    }

    pub fn shift_origin(&mut self, new_origin: Vec2) {
        self.broad_phase.shift_origin(new_origin);
    }
}
