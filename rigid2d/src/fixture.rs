//! Fixtures: a shape bound to a body with material and filter data, plus the
//! broad-phase proxies covering each shape child.

use smallvec::SmallVec;

use crate::collision::broad_phase::BroadPhase;
use crate::core::math::Transform;
use crate::filter::Filter;
use crate::query::{Aabb, RayCastInput, RayCastOutput};
use crate::shapes::{MassData, Shape};
use crate::types::{BodyId, FixtureId, Vec2};

/// Broad-phase handle stored as tree userdata: which fixture child a proxy
/// belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FixtureProxy {
    pub fixture: FixtureId,
    pub child: usize,
}

/// Fixture definition with builder API.
#[derive(Clone, Debug)]
pub struct FixtureDef {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_sensor: bool,
    pub filter: Filter,
    pub user_data: u64,
}

impl Default for FixtureDef {
    fn default() -> Self {
        Self {
            density: 0.0,
            friction: 0.2,
            restitution: 0.0,
            is_sensor: false,
            filter: Filter::default(),
            user_data: 0,
        }
    }
}

impl FixtureDef {
    pub fn builder() -> FixtureDefBuilder {
        FixtureDefBuilder {
            def: Self::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FixtureDefBuilder {
    def: FixtureDef,
}

impl FixtureDefBuilder {
    /// Density in kg/m^2. Affects body mass.
    pub fn density(mut self, v: f32) -> Self {
        self.def.density = v;
        self
    }
    /// Coulomb friction coefficient, usually in [0, 1].
    pub fn friction(mut self, v: f32) -> Self {
        self.def.friction = v;
        self
    }
    /// Restitution (bounciness) in [0, 1].
    pub fn restitution(mut self, v: f32) -> Self {
        self.def.restitution = v;
        self
    }
    /// Mark as sensor: reports contacts but applies no impulse.
    pub fn sensor(mut self, flag: bool) -> Self {
        self.def.is_sensor = flag;
        self
    }
    /// Collision filter (category/mask/group).
    pub fn filter(mut self, f: Filter) -> Self {
        self.def.filter = f;
        self
    }
    /// Opaque user handle.
    pub fn user_data(mut self, v: u64) -> Self {
        self.def.user_data = v;
        self
    }

    #[must_use]
    pub fn build(self) -> FixtureDef {
        self.def
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct ProxyRecord {
    pub proxy_id: i32,
    pub child: usize,
}

/// A shape attached to a body. Owned by a world and addressed by
/// [`FixtureId`]; the body keeps the list of its fixtures.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub(crate) body: BodyId,
    pub(crate) shape: Shape,
    pub(crate) density: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) is_sensor: bool,
    pub(crate) filter: Filter,
    pub(crate) proxies: SmallVec<[ProxyRecord; 2]>,
    pub user_data: u64,
}

impl Fixture {
    pub(crate) fn new(body: BodyId, def: &FixtureDef, shape: Shape) -> Self {
        debug_assert!(def.density >= 0.0);
        debug_assert!(def.friction >= 0.0);
        Self {
            body,
            shape,
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            is_sensor: def.is_sensor,
            filter: def.filter,
            proxies: SmallVec::new(),
            user_data: def.user_data,
        }
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn set_friction(&mut self, v: f32) {
        self.friction = v;
    }

    pub fn set_restitution(&mut self, v: f32) {
        self.restitution = v;
    }

    /// Density takes effect at the next mass reset.
    pub fn set_density(&mut self, v: f32) {
        debug_assert!(v >= 0.0);
        self.density = v;
    }

    pub fn compute_mass(&self) -> MassData {
        self.shape.compute_mass(self.density)
    }

    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        self.shape.test_point(xf, point)
    }

    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: &Transform,
        child: usize,
    ) -> Option<RayCastOutput> {
        self.shape.ray_cast(input, xf, child)
    }

    /// Fat AABB of a child's proxy, as stored in the broad-phase.
    pub(crate) fn proxy_aabb(
        &self,
        broad_phase: &BroadPhase<FixtureProxy>,
        child: usize,
    ) -> Aabb {
        let proxy = &self.proxies[child];
        broad_phase.fat_aabb(proxy.proxy_id)
    }

    pub(crate) fn create_proxies(
        &mut self,
        id: FixtureId,
        broad_phase: &mut BroadPhase<FixtureProxy>,
        xf: &Transform,
    ) {
        debug_assert!(self.proxies.is_empty());
        for child in 0..self.shape.child_count() {
            let aabb = self.shape.compute_aabb(xf, child);
            let proxy_id = broad_phase.create_proxy(aabb, FixtureProxy { fixture: id, child });
            self.proxies.push(ProxyRecord { proxy_id, child });
        }
    }

    pub(crate) fn destroy_proxies(&mut self, broad_phase: &mut BroadPhase<FixtureProxy>) {
        for proxy in self.proxies.drain(..) {
            broad_phase.destroy_proxy(proxy.proxy_id);
        }
    }

    /// Re-insert proxies for a body that moved from `xf1` to `xf2`. The new
    /// AABB covers both poses so tunneling candidates stay in the tree.
    pub(crate) fn synchronize(
        &mut self,
        broad_phase: &mut BroadPhase<FixtureProxy>,
        xf1: &Transform,
        xf2: &Transform,
    ) {
        for proxy in &self.proxies {
            let aabb1 = self.shape.compute_aabb(xf1, proxy.child);
            let aabb2 = self.shape.compute_aabb(xf2, proxy.child);
            let aabb = aabb1.union(&aabb2);
            let displacement = aabb2.center() - aabb1.center();
            broad_phase.move_proxy(proxy.proxy_id, aabb, displacement);
        }
    }

    /// Poke every proxy so the broad-phase re-evaluates its pairs.
    pub(crate) fn touch_proxies(&self, broad_phase: &mut BroadPhase<FixtureProxy>) {
        for proxy in &self.proxies {
            broad_phase.touch_proxy(proxy.proxy_id);
        }
    }
}
