//! Shape geometry.
//!
//! Shapes are immutable local-space geometry plus material-independent mass
//! helpers. They are attached to bodies through fixtures; a fixture owns one
//! broad-phase proxy per shape child (chains have many children, the rest
//! have one).

pub mod chain;

pub use chain::ChainShape;

use crate::core::math::Transform;
use crate::query::{Aabb, RayCastInput, RayCastOutput};
use crate::tuning;
use crate::types::Vec2;

/// Mass, center of mass, and rotational inertia about the origin.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MassData {
    pub mass: f32,
    pub center: Vec2,
    pub inertia: f32,
}

/// Shape construction failure. Construction validates input and fails before
/// any state is stored.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon is degenerate after welding near-duplicate points")]
    DegeneratePolygon,
    #[error("chain needs at least {min} vertices, got {got}")]
    ChainTooShort { min: usize, got: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShapeType {
    Circle,
    Edge,
    Polygon,
    Chain,
}

/// A circle at a local position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CircleShape {
    pub position: Vec2,
    pub radius: f32,
}

impl CircleShape {
    pub fn new<P: Into<Vec2>>(position: P, radius: f32) -> Self {
        Self {
            position: position.into(),
            radius,
        }
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        let mass = density * std::f32::consts::PI * self.radius * self.radius;
        MassData {
            mass,
            center: self.position,
            // inertia about the origin, via parallel axis
            inertia: mass * (0.5 * self.radius * self.radius + self.position.dot(self.position)),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let p = xf.transform_point(self.position);
        let r = Vec2::new(self.radius, self.radius);
        Aabb {
            lower: p - r,
            upper: p + r,
        }
    }

    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        let center = xf.transform_point(self.position);
        (point - center).length_squared() <= self.radius * self.radius
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let position = xf.transform_point(self.position);
        let s = input.p1 - position;
        let b = s.length_squared() - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(r);
        let rr = r.length_squared();
        let sigma = c * c - rr * b;

        if sigma < 0.0 || rr < f32::EPSILON {
            return None;
        }

        let mut a = -(c + sigma.sqrt());
        if 0.0 <= a && a <= input.max_fraction * rr {
            a /= rr;
            return Some(RayCastOutput {
                fraction: a,
                normal: (s + r * a).normalized(),
            });
        }
        None
    }
}

/// A line segment with optional ghost vertices for smooth chain traversal.
///
/// When `one_sided` is set, collision only responds on the side the normal
/// points to, and the ghost vertices are consulted to suppress ghost
/// collisions at the joints between neighboring edges.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgeShape {
    pub vertex1: Vec2,
    pub vertex2: Vec2,
    pub vertex0: Vec2,
    pub vertex3: Vec2,
    pub one_sided: bool,
}

impl EdgeShape {
    /// A free-standing two-sided edge.
    pub fn new<A: Into<Vec2>, B: Into<Vec2>>(v1: A, v2: B) -> Self {
        Self {
            vertex1: v1.into(),
            vertex2: v2.into(),
            vertex0: Vec2::ZERO,
            vertex3: Vec2::ZERO,
            one_sided: false,
        }
    }

    /// A one-sided edge with ghost vertices `v0` and `v3` adjacent to the
    /// segment `v1 -> v2`. Collision is ignored on the back side.
    pub fn one_sided<A: Into<Vec2>, B: Into<Vec2>, C: Into<Vec2>, D: Into<Vec2>>(
        v0: A,
        v1: B,
        v2: C,
        v3: D,
    ) -> Self {
        Self {
            vertex0: v0.into(),
            vertex1: v1.into(),
            vertex2: v2.into(),
            vertex3: v3.into(),
            one_sided: true,
        }
    }

    pub fn compute_mass(&self, _density: f32) -> MassData {
        MassData {
            mass: 0.0,
            center: (self.vertex1 + self.vertex2) * 0.5,
            inertia: 0.0,
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let v1 = xf.transform_point(self.vertex1);
        let v2 = xf.transform_point(self.vertex2);
        let r = Vec2::new(tuning::POLYGON_RADIUS, tuning::POLYGON_RADIUS);
        Aabb {
            lower: v1.min(v2) - r,
            upper: v1.max(v2) + r,
        }
    }

    // p = p1 + t * d, v = v1 + s * e
    // p1 + t * d = v1 + s * e, solved with the edge normal
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.inv_transform_point(input.p1);
        let p2 = xf.inv_transform_point(input.p2);
        let d = p2 - p1;

        let v1 = self.vertex1;
        let v2 = self.vertex2;
        let e = v2 - v1;

        let mut normal = Vec2::new(e.y, -e.x).normalized();

        let numerator = normal.dot(v1 - p1);
        if self.one_sided && numerator > 0.0 {
            return None;
        }

        let denominator = normal.dot(d);
        if denominator == 0.0 {
            return None;
        }

        let t = numerator / denominator;
        if t < 0.0 || input.max_fraction < t {
            return None;
        }

        let q = p1 + d * t;

        let rr = e.length_squared();
        if rr == 0.0 {
            return None;
        }
        let s = (q - v1).dot(e) / rr;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        if numerator > 0.0 {
            normal = -normal;
        }
        Some(RayCastOutput {
            fraction: t,
            normal: xf.q.rotate_vec(normal),
        })
    }
}

/// A convex polygon: CCW hull vertices with outward edge normals and cached
/// centroid. Vertex count is bounded by [`tuning::MAX_POLYGON_VERTICES`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PolygonShape {
    pub vertices: [Vec2; tuning::MAX_POLYGON_VERTICES],
    pub normals: [Vec2; tuning::MAX_POLYGON_VERTICES],
    pub centroid: Vec2,
    pub count: usize,
    pub radius: f32,
}

impl PolygonShape {
    /// Build the convex hull of `points`. Near-duplicate points are welded at
    /// half linear slop; the hull is gift-wrapped from the right-most point
    /// and validated to be non-degenerate.
    pub fn new<I, P>(points: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec2>,
    {
        let raw: Vec<Vec2> = points.into_iter().map(Into::into).collect();
        let given = raw.len();
        if given < 3 {
            return Err(ShapeError::TooFewVertices(given));
        }

        // Weld near-duplicates.
        let weld_tol_sq = (0.5 * tuning::LINEAR_SLOP) * (0.5 * tuning::LINEAR_SLOP);
        let mut unique: Vec<Vec2> = Vec::with_capacity(tuning::MAX_POLYGON_VERTICES);
        for p in raw.into_iter().take(tuning::MAX_POLYGON_VERTICES) {
            if unique
                .iter()
                .all(|q| p.distance_squared(*q) > weld_tol_sq)
            {
                unique.push(p);
            }
        }
        if unique.len() < 3 {
            return Err(ShapeError::DegeneratePolygon);
        }

        // Gift wrap from the right-most point.
        let mut i0 = 0;
        let mut x0 = unique[0].x;
        for (i, p) in unique.iter().enumerate().skip(1) {
            if p.x > x0 || (p.x == x0 && p.y < unique[i0].y) {
                i0 = i;
                x0 = p.x;
            }
        }

        let n = unique.len();
        let mut hull = [0usize; tuning::MAX_POLYGON_VERTICES];
        let mut m = 0;
        let mut ih = i0;
        loop {
            debug_assert!(m < tuning::MAX_POLYGON_VERTICES);
            hull[m] = ih;
            m += 1;

            let mut ie = 0;
            for j in 1..n {
                if ie == ih {
                    ie = j;
                    continue;
                }
                let r = unique[ie] - unique[hull[m - 1]];
                let v = unique[j] - unique[hull[m - 1]];
                let c = r.cross(v);
                if c < 0.0 || (c == 0.0 && v.length_squared() > r.length_squared()) {
                    ie = j;
                }
            }

            ih = ie;
            if ie == i0 {
                break;
            }
        }

        if m < 3 {
            return Err(ShapeError::DegeneratePolygon);
        }

        let mut vertices = [Vec2::ZERO; tuning::MAX_POLYGON_VERTICES];
        for i in 0..m {
            vertices[i] = unique[hull[i]];
        }

        let mut normals = [Vec2::ZERO; tuning::MAX_POLYGON_VERTICES];
        for i in 0..m {
            let i2 = if i + 1 < m { i + 1 } else { 0 };
            let edge = vertices[i2] - vertices[i];
            if edge.length_squared() <= f32::EPSILON * f32::EPSILON {
                return Err(ShapeError::DegeneratePolygon);
            }
            normals[i] = edge.cross_scalar(1.0).normalized();
        }

        let centroid = compute_centroid(&vertices[..m]);
        Ok(Self {
            vertices,
            normals,
            centroid,
            count: m,
            radius: tuning::POLYGON_RADIUS,
        })
    }

    /// Axis-aligned box with half extents `hx`, `hy` centered on the origin.
    pub fn new_box(hx: f32, hy: f32) -> Self {
        let mut shape = Self {
            vertices: [Vec2::ZERO; tuning::MAX_POLYGON_VERTICES],
            normals: [Vec2::ZERO; tuning::MAX_POLYGON_VERTICES],
            centroid: Vec2::ZERO,
            count: 4,
            radius: tuning::POLYGON_RADIUS,
        };
        shape.vertices[0] = Vec2::new(-hx, -hy);
        shape.vertices[1] = Vec2::new(hx, -hy);
        shape.vertices[2] = Vec2::new(hx, hy);
        shape.vertices[3] = Vec2::new(-hx, hy);
        shape.normals[0] = Vec2::new(0.0, -1.0);
        shape.normals[1] = Vec2::new(1.0, 0.0);
        shape.normals[2] = Vec2::new(0.0, 1.0);
        shape.normals[3] = Vec2::new(-1.0, 0.0);
        shape
    }

    /// Oriented box centered on `center` and rotated by `angle`.
    pub fn new_box_at<C: Into<Vec2>>(hx: f32, hy: f32, center: C, angle: f32) -> Self {
        let center = center.into();
        let mut shape = Self::new_box(hx, hy);
        shape.centroid = center;
        let xf = Transform::from_pos_angle(center, angle);
        for i in 0..4 {
            shape.vertices[i] = xf.transform_point(shape.vertices[i]);
            shape.normals[i] = xf.q.rotate_vec(shape.normals[i]);
        }
        shape
    }

    /// Strict convexity check over the computed normals. Holds for every
    /// successfully constructed polygon.
    pub fn is_convex(&self) -> bool {
        for i in 0..self.count {
            let i2 = if i + 1 < self.count { i + 1 } else { 0 };
            let edge = self.vertices[i2] - self.vertices[i];
            for j in 0..self.count {
                if j == i || j == i2 {
                    continue;
                }
                let r = self.vertices[j] - self.vertices[i];
                if edge.cross(r) <= 0.0 {
                    return false;
                }
            }
        }
        true
    }

    pub fn area(&self) -> f32 {
        let mut area = 0.0;
        let reference = self.vertices[0];
        for i in 1..self.count - 1 {
            let e1 = self.vertices[i] - reference;
            let e2 = self.vertices[i + 1] - reference;
            area += 0.5 * e1.cross(e2);
        }
        area
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        debug_assert!(self.count >= 3);

        let mut center = Vec2::ZERO;
        let mut area = 0.0;
        let mut inertia = 0.0;

        // Integrate over triangles fanned from an interior reference point.
        let mut reference = Vec2::ZERO;
        for v in &self.vertices[..self.count] {
            reference += *v;
        }
        reference *= 1.0 / self.count as f32;

        const INV3: f32 = 1.0 / 3.0;
        for i in 0..self.count {
            let e1 = self.vertices[i] - reference;
            let e2 = self.vertices[if i + 1 < self.count { i + 1 } else { 0 }] - reference;

            let d = e1.cross(e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;

            center += (e1 + e2) * (triangle_area * INV3);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * INV3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        debug_assert!(area > f32::EPSILON);
        center *= 1.0 / area;
        let world_center = center + reference;

        // Inertia about the origin via the parallel axis theorem.
        let inertia_about_origin = density * inertia
            + mass * (world_center.dot(world_center) - center.dot(center));
        MassData {
            mass,
            center: world_center,
            inertia: inertia_about_origin,
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let mut lower = xf.transform_point(self.vertices[0]);
        let mut upper = lower;
        for v in &self.vertices[1..self.count] {
            let p = xf.transform_point(*v);
            lower = lower.min(p);
            upper = upper.max(p);
        }
        let r = Vec2::new(self.radius, self.radius);
        Aabb {
            lower: lower - r,
            upper: upper + r,
        }
    }

    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        let local = xf.inv_transform_point(point);
        for i in 0..self.count {
            if self.normals[i].dot(local - self.vertices[i]) > 0.0 {
                return false;
            }
        }
        true
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.inv_transform_point(input.p1);
        let p2 = xf.inv_transform_point(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        for i in 0..self.count {
            let numerator = self.normals[i].dot(self.vertices[i] - p1);
            let denominator = self.normals[i].dot(d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else {
                if denominator < 0.0 && numerator < lower * denominator {
                    lower = numerator / denominator;
                    index = Some(i);
                } else if denominator > 0.0 && numerator < upper * denominator {
                    upper = numerator / denominator;
                }
            }

            if upper < lower {
                return None;
            }
        }

        debug_assert!((0.0..=input.max_fraction).contains(&lower));
        index.map(|i| RayCastOutput {
            fraction: lower,
            normal: xf.q.rotate_vec(self.normals[i]),
        })
    }
}

fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
    debug_assert!(vertices.len() >= 3);
    let mut center = Vec2::ZERO;
    let mut area = 0.0;

    let mut reference = Vec2::ZERO;
    for v in vertices {
        reference += *v;
    }
    reference *= 1.0 / vertices.len() as f32;

    const INV3: f32 = 1.0 / 3.0;
    for i in 0..vertices.len() {
        let e1 = vertices[i] - reference;
        let e2 = vertices[if i + 1 < vertices.len() { i + 1 } else { 0 }] - reference;
        let triangle_area = 0.5 * e1.cross(e2);
        area += triangle_area;
        center += (e1 + e2) * (triangle_area * INV3);
    }

    debug_assert!(area > f32::EPSILON);
    center * (1.0 / area) + reference
}

/// Local geometry of a fixture: one variant per shape kind.
#[derive(Clone, Debug)]
pub enum Shape {
    Circle(CircleShape),
    Edge(EdgeShape),
    Polygon(PolygonShape),
    Chain(ChainShape),
}

impl Shape {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle(_) => ShapeType::Circle,
            Shape::Edge(_) => ShapeType::Edge,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::Chain(_) => ShapeType::Chain,
        }
    }

    /// Number of broad-phase children. Chains have one child per edge.
    pub fn child_count(&self) -> usize {
        match self {
            Shape::Chain(chain) => chain.edge_count(),
            _ => 1,
        }
    }

    /// Shape skin radius.
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(c) => c.radius,
            Shape::Edge(_) => tuning::POLYGON_RADIUS,
            Shape::Polygon(p) => p.radius,
            Shape::Chain(_) => tuning::POLYGON_RADIUS,
        }
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Circle(c) => c.compute_mass(density),
            Shape::Edge(e) => e.compute_mass(density),
            Shape::Polygon(p) => p.compute_mass(density),
            Shape::Chain(c) => c.compute_mass(density),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform, child: usize) -> Aabb {
        match self {
            Shape::Circle(c) => c.compute_aabb(xf),
            Shape::Edge(e) => e.compute_aabb(xf),
            Shape::Polygon(p) => p.compute_aabb(xf),
            Shape::Chain(c) => c.child_edge(child).compute_aabb(xf),
        }
    }

    /// Point containment in world space. Open shapes never contain points.
    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        match self {
            Shape::Circle(c) => c.test_point(xf, point),
            Shape::Polygon(p) => p.test_point(xf, point),
            Shape::Edge(_) | Shape::Chain(_) => false,
        }
    }

    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: &Transform,
        child: usize,
    ) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(c) => c.ray_cast(input, xf),
            Shape::Edge(e) => e.ray_cast(input, xf),
            Shape::Polygon(p) => p.ray_cast(input, xf),
            Shape::Chain(c) => c.child_edge(child).ray_cast(input, xf),
        }
    }
}

impl From<CircleShape> for Shape {
    fn from(s: CircleShape) -> Self {
        Shape::Circle(s)
    }
}
impl From<EdgeShape> for Shape {
    fn from(s: EdgeShape) -> Self {
        Shape::Edge(s)
    }
}
impl From<PolygonShape> for Shape {
    fn from(s: PolygonShape) -> Self {
        Shape::Polygon(s)
    }
}
impl From<ChainShape> for Shape {
    fn from(s: ChainShape) -> Self {
        Shape::Chain(s)
    }
}

/// Circle primitive helper.
#[inline]
pub fn circle<V: Into<Vec2>>(center: V, radius: f32) -> CircleShape {
    CircleShape::new(center, radius)
}

/// Edge primitive helper.
#[inline]
pub fn edge<A: Into<Vec2>, B: Into<Vec2>>(v1: A, v2: B) -> EdgeShape {
    EdgeShape::new(v1, v2)
}

/// Box polygon helper.
#[inline]
pub fn box_polygon(half_width: f32, half_height: f32) -> PolygonShape {
    PolygonShape::new_box(half_width, half_height)
}

/// Convex hull polygon helper.
pub fn polygon_from_points<I, P>(points: I) -> Result<PolygonShape, ShapeError>
where
    I: IntoIterator<Item = P>,
    P: Into<Vec2>,
{
    PolygonShape::new(points)
}
