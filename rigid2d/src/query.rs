//! Query value types: axis-aligned boxes, ray casts, and query filters.

use crate::filter::Filter;
use crate::types::{FixtureId, Vec2};

/// Axis-aligned bounding box.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub lower: Vec2,
    pub upper: Vec2,
}

impl Aabb {
    pub fn new<L: Into<Vec2>, U: Into<Vec2>>(lower: L, upper: U) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    pub fn from_center_half_extents<C: Into<Vec2>, H: Into<Vec2>>(center: C, half: H) -> Self {
        let center = center.into();
        let half = half.into();
        Self {
            lower: center - half,
            upper: center + half,
        }
    }

    /// Bounds must be ordered and finite.
    pub fn is_valid(&self) -> bool {
        let d = self.upper - self.lower;
        d.x >= 0.0 && d.y >= 0.0 && self.lower.is_valid() && self.upper.is_valid()
    }

    pub fn center(&self) -> Vec2 {
        (self.lower + self.upper) * 0.5
    }

    pub fn extents(&self) -> Vec2 {
        (self.upper - self.lower) * 0.5
    }

    pub fn perimeter(&self) -> f32 {
        let wx = self.upper.x - self.lower.x;
        let wy = self.upper.y - self.lower.y;
        2.0 * (wx + wy)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && other.upper.x <= self.upper.x
            && other.upper.y <= self.upper.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d1 = other.lower - self.upper;
        let d2 = self.lower - other.upper;
        d1.x <= 0.0 && d1.y <= 0.0 && d2.x <= 0.0 && d2.y <= 0.0
    }

    /// Grow the box by `amount` on every side.
    pub fn extended(&self, amount: f32) -> Aabb {
        let r = Vec2::new(amount, amount);
        Aabb {
            lower: self.lower - r,
            upper: self.upper + r,
        }
    }
}

/// Input for a ray cast from `p1` toward `p2`, clipped at `max_fraction`.
#[derive(Copy, Clone, Debug)]
pub struct RayCastInput {
    pub p1: Vec2,
    pub p2: Vec2,
    pub max_fraction: f32,
}

/// A ray hit: the surface normal and the fraction along `p1 -> p2`.
#[derive(Copy, Clone, Debug)]
pub struct RayCastOutput {
    pub normal: Vec2,
    pub fraction: f32,
}

/// Category/mask restriction for world queries.
#[derive(Copy, Clone, Debug)]
pub struct QueryFilter {
    pub category_bits: u32,
    pub mask_bits: u32,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            category_bits: 0x0001,
            mask_bits: u32::MAX,
        }
    }
}

impl QueryFilter {
    pub fn category(mut self, bits: u32) -> Self {
        self.category_bits = bits;
        self
    }

    pub fn mask(mut self, bits: u32) -> Self {
        self.mask_bits = bits;
        self
    }

    pub fn accepts(&self, filter: &Filter) -> bool {
        (self.mask_bits & filter.category_bits) != 0
            && (self.category_bits & filter.mask_bits) != 0
    }
}

/// Result of a closest-hit ray cast convenience query.
#[derive(Copy, Clone, Debug)]
pub struct RayResult {
    pub fixture: FixtureId,
    pub point: Vec2,
    pub normal: Vec2,
    pub fraction: f32,
}
