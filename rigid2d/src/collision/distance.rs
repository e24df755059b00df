//! GJK distance between convex shapes, and a GJK-based shape cast.
//!
//! The simplex cache lets repeat queries (notably the TOI inner loop) warm
//! start from the previous witness feature.

use crate::core::math::Transform;
use crate::shapes::Shape;
use crate::tuning;
use crate::types::Vec2;

/// A convex point cloud with a radius, the view of a shape child that GJK
/// operates on.
#[derive(Clone, Debug)]
pub struct DistanceProxy {
    vertices: [Vec2; tuning::MAX_POLYGON_VERTICES],
    count: usize,
    radius: f32,
}

impl DistanceProxy {
    pub fn new(shape: &Shape, child: usize) -> Self {
        match shape {
            Shape::Circle(c) => Self::from_vertices(&[c.position], c.radius),
            Shape::Polygon(p) => Self::from_vertices(&p.vertices[..p.count], p.radius),
            Shape::Edge(e) => {
                Self::from_vertices(&[e.vertex1, e.vertex2], tuning::POLYGON_RADIUS)
            }
            Shape::Chain(chain) => {
                let edge = chain.child_edge(child);
                Self::from_vertices(&[edge.vertex1, edge.vertex2], tuning::POLYGON_RADIUS)
            }
        }
    }

    pub fn from_vertices(vertices: &[Vec2], radius: f32) -> Self {
        debug_assert!(!vertices.is_empty() && vertices.len() <= tuning::MAX_POLYGON_VERTICES);
        let mut buf = [Vec2::ZERO; tuning::MAX_POLYGON_VERTICES];
        buf[..vertices.len()].copy_from_slice(vertices);
        Self {
            vertices: buf,
            count: vertices.len(),
            radius,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn vertex(&self, index: usize) -> Vec2 {
        debug_assert!(index < self.count);
        self.vertices[index]
    }

    /// Index of the support vertex in direction `d`.
    pub fn support(&self, d: Vec2) -> usize {
        let mut best = 0;
        let mut best_value = self.vertices[0].dot(d);
        for i in 1..self.count {
            let value = self.vertices[i].dot(d);
            if value > best_value {
                best = i;
                best_value = value;
            }
        }
        best
    }
}

/// Witness of a previous GJK run, used to warm start the next one.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimplexCache {
    pub metric: f32,
    pub count: u16,
    pub index_a: [u8; 3],
    pub index_b: [u8; 3],
}

#[derive(Copy, Clone, Debug)]
pub struct DistanceInput<'a> {
    pub proxy_a: &'a DistanceProxy,
    pub proxy_b: &'a DistanceProxy,
    pub transform_a: Transform,
    pub transform_b: Transform,
    pub use_radii: bool,
}

#[derive(Copy, Clone, Debug)]
pub struct DistanceOutput {
    pub point_a: Vec2,
    pub point_b: Vec2,
    pub distance: f32,
    pub iterations: usize,
}

#[derive(Copy, Clone, Debug, Default)]
struct SimplexVertex {
    wa: Vec2,
    wb: Vec2,
    w: Vec2,
    a: f32,
    index_a: usize,
    index_b: usize,
}

#[derive(Copy, Clone, Debug, Default)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn read_cache(
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
    ) -> Simplex {
        debug_assert!(cache.count <= 3);
        let mut simplex = Simplex::default();

        simplex.count = cache.count as usize;
        for i in 0..simplex.count {
            let v = &mut simplex.v[i];
            v.index_a = cache.index_a[i] as usize;
            v.index_b = cache.index_b[i] as usize;
            let wa_local = proxy_a.vertex(v.index_a);
            let wb_local = proxy_b.vertex(v.index_b);
            v.wa = xf_a.transform_point(wa_local);
            v.wb = xf_b.transform_point(wb_local);
            v.w = v.wb - v.wa;
            v.a = 0.0;
        }

        // If the cached metric drifted too far, flush the simplex.
        if simplex.count > 1 {
            let metric1 = cache.metric;
            let metric2 = simplex.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < f32::EPSILON {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            let v = &mut simplex.v[0];
            v.index_a = 0;
            v.index_b = 0;
            let wa_local = proxy_a.vertex(0);
            let wb_local = proxy_b.vertex(0);
            v.wa = xf_a.transform_point(wa_local);
            v.wb = xf_b.transform_point(wb_local);
            v.w = v.wb - v.wa;
            v.a = 1.0;
            simplex.count = 1;
        }
        simplex
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count as u16;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a as u8;
            cache.index_b[i] = self.v[i].index_b as u8;
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = e12.cross(-self.v[0].w);
                if sgn > 0.0 {
                    // Origin is left of e12.
                    crate::types::cross_scalar_vec(1.0, e12)
                } else {
                    e12.cross_scalar(1.0)
                }
            }
            _ => {
                debug_assert!(false);
                Vec2::ZERO
            }
        }
    }

    fn closest_point(&self) -> Vec2 {
        match self.count {
            1 => self.v[0].w,
            2 => self.v[0].w * self.v[0].a + self.v[1].w * self.v[1].a,
            3 => Vec2::ZERO,
            _ => {
                debug_assert!(false);
                Vec2::ZERO
            }
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        match self.count {
            1 => (self.v[0].wa, self.v[0].wb),
            2 => (
                self.v[0].wa * self.v[0].a + self.v[1].wa * self.v[1].a,
                self.v[0].wb * self.v[0].a + self.v[1].wb * self.v[1].a,
            ),
            3 => {
                let p = self.v[0].wa * self.v[0].a
                    + self.v[1].wa * self.v[1].a
                    + self.v[2].wa * self.v[2].a;
                (p, p)
            }
            _ => {
                debug_assert!(false);
                (Vec2::ZERO, Vec2::ZERO)
            }
        }
    }

    fn metric(&self) -> f32 {
        match self.count {
            1 => 0.0,
            2 => (self.v[0].w - self.v[1].w).length(),
            3 => (self.v[1].w - self.v[0].w).cross(self.v[2].w - self.v[0].w),
            _ => {
                debug_assert!(false);
                0.0
            }
        }
    }

    // Closest point on segment v0-v1 to the origin, expressed barycentrically.
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        let d12_2 = -w1.dot(e12);
        if d12_2 <= 0.0 {
            // Vertex region w1.
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        let d12_1 = w2.dot(e12);
        if d12_1 <= 0.0 {
            // Vertex region w2.
            self.v[0] = self.v[1];
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    // Voronoi-region case analysis for the triangle simplex.
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        let e12 = w2 - w1;
        let w1e12 = w1.dot(e12);
        let w2e12 = w2.dot(e12);
        let d12_1 = w2e12;
        let d12_2 = -w1e12;

        let e13 = w3 - w1;
        let w1e13 = w1.dot(e13);
        let w3e13 = w3.dot(e13);
        let d13_1 = w3e13;
        let d13_2 = -w1e13;

        let e23 = w3 - w2;
        let w2e23 = w2.dot(e23);
        let w3e23 = w3.dot(e23);
        let d23_1 = w3e23;
        let d23_2 = -w2e23;

        let n123 = e12.cross(e13);
        let d123_1 = n123 * w2.cross(w3);
        let d123_2 = n123 * w3.cross(w1);
        let d123_3 = n123 * w1.cross(w2);

        // w1 region
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // e12
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv_d12 = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv_d12;
            self.v[1].a = d12_2 * inv_d12;
            self.count = 2;
            return;
        }

        // e13
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv_d13 = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv_d13;
            self.v[2].a = d13_2 * inv_d13;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // w2 region
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // w3 region
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[2].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[2];
            return;
        }

        // e23
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv_d23 = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv_d23;
            self.v[2].a = d23_2 * inv_d23;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // Interior: origin is inside the triangle.
        let inv_d123 = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv_d123;
        self.v[1].a = d123_2 * inv_d123;
        self.v[2].a = d123_3 * inv_d123;
        self.count = 3;
    }
}

/// Closest points between two convex proxies. The cache warm starts the
/// search and receives the terminal witness.
pub fn distance(cache: &mut SimplexCache, input: &DistanceInput) -> DistanceOutput {
    let proxy_a = input.proxy_a;
    let proxy_b = input.proxy_b;
    let xf_a = input.transform_a;
    let xf_b = input.transform_b;

    let mut simplex = Simplex::read_cache(cache, proxy_a, &xf_a, proxy_b, &xf_b);

    let mut iterations = 0;
    // Vertices of the last simplex, to detect duplicate support points.
    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    while iterations < tuning::MAX_DISTANCE_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        match simplex.count {
            1 => {}
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            _ => debug_assert!(false),
        }

        // A 3-simplex means the origin is inside the hull: overlap.
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();
        if d.length_squared() < f32::EPSILON * f32::EPSILON {
            // The origin is probably contained by a line segment or triangle.
            // Thus the shapes are overlapped. We can't return zero here even
            // though there may be overlap: in case the simplex is a point,
            // segment, or triangle it is difficult to determine if the origin
            // is contained in the CSO or very close to it.
            break;
        }

        // New support point.
        let vertex = &mut simplex.v[simplex.count];
        vertex.index_a = proxy_a.support(xf_a.q.inv_rotate_vec(-d));
        vertex.wa = xf_a.transform_point(proxy_a.vertex(vertex.index_a));
        vertex.index_b = proxy_b.support(xf_b.q.inv_rotate_vec(d));
        vertex.wb = xf_b.transform_point(proxy_b.vertex(vertex.index_b));
        vertex.w = vertex.wb - vertex.wa;

        iterations += 1;

        // A repeated support point means we've reached the closest feature.
        let mut duplicate = false;
        for i in 0..save_count {
            if vertex.index_a == save_a[i] && vertex.index_b == save_b[i] {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            break;
        }

        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut dist = (point_a - point_b).length();
    simplex.write_cache(cache);

    if input.use_radii {
        let r_a = proxy_a.radius();
        let r_b = proxy_b.radius();
        if dist > r_a + r_b && dist > f32::EPSILON {
            // Shapes still not overlapped: shift witnesses to the surfaces.
            dist -= r_a + r_b;
            let normal = (point_b - point_a).normalized();
            point_a += normal * r_a;
            point_b -= normal * r_b;
        } else {
            // Overlapped when radii apply; collapse to a common point.
            let p = (point_a + point_b) * 0.5;
            point_a = p;
            point_b = p;
            dist = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance: dist,
        iterations,
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ShapeCastInput<'a> {
    pub proxy_a: &'a DistanceProxy,
    pub proxy_b: &'a DistanceProxy,
    pub transform_a: Transform,
    pub transform_b: Transform,
    pub translation_b: Vec2,
}

#[derive(Copy, Clone, Debug)]
pub struct ShapeCastOutput {
    pub point: Vec2,
    pub normal: Vec2,
    pub lambda: f32,
    pub iterations: usize,
}

/// Cast proxy B along `translation_b` against proxy A. Returns the first
/// touch, or None on a miss.
///
/// GJK-raycast per Gino van den Bergen's "Smooth Mesh Contacts with GJK".
pub fn shape_cast(input: &ShapeCastInput) -> Option<ShapeCastOutput> {
    let proxy_a = input.proxy_a;
    let proxy_b = input.proxy_b;

    let radius_a = proxy_a.radius().max(tuning::POLYGON_RADIUS);
    let radius_b = proxy_b.radius().max(tuning::POLYGON_RADIUS);
    let radius = radius_a + radius_b;

    let xf_a = input.transform_a;
    let xf_b = input.transform_b;
    let r = input.translation_b;

    let mut lambda = 0.0;
    let mut normal = Vec2::ZERO;

    let mut simplex = Simplex::default();

    // Initial support in the direction between centers.
    let mut index_a = proxy_a.support(xf_a.q.inv_rotate_vec(-r));
    let mut wa = xf_a.transform_point(proxy_a.vertex(index_a));
    let mut index_b = proxy_b.support(xf_b.q.inv_rotate_vec(r));
    let mut wb = xf_b.transform_point(proxy_b.vertex(index_b));
    let mut v = wa - wb;

    let sigma = tuning::POLYGON_RADIUS.max(radius - tuning::POLYGON_RADIUS);
    let tol = 0.5 * tuning::LINEAR_SLOP;

    let max_iterations = 20;
    let mut iterations = 0;
    while iterations < max_iterations && v.length() - sigma > tol {
        debug_assert!(simplex.count < 3);
        iterations += 1;

        index_a = proxy_a.support(xf_a.q.inv_rotate_vec(-v));
        wa = xf_a.transform_point(proxy_a.vertex(index_a));
        index_b = proxy_b.support(xf_b.q.inv_rotate_vec(v));
        wb = xf_b.transform_point(proxy_b.vertex(index_b));
        let p = wa - wb;

        // -v is a normal at p.
        v.normalize();

        // Intersect the cast ray with the supporting plane and advance lambda.
        let vp = v.dot(p);
        let vr = v.dot(r);
        if vp - sigma > lambda * vr {
            if vr <= 0.0 {
                return None;
            }
            lambda = (vp - sigma) / vr;
            if lambda > 1.0 {
                return None;
            }
            normal = -v;
            simplex.count = 0;
        }

        // The simplex tracks B - A with B advanced by the translation reached
        // so far; the support point itself stays unshifted so the plane test
        // above sees the original geometry.
        let vertex = &mut simplex.v[simplex.count];
        vertex.index_a = index_b;
        vertex.wa = wb + r * lambda;
        vertex.index_b = index_a;
        vertex.wb = wa;
        vertex.w = vertex.wb - vertex.wa;
        vertex.a = 1.0;
        simplex.count += 1;

        match simplex.count {
            1 => {}
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            _ => debug_assert!(false),
        }

        // A triangle simplex means overlap at the current lambda.
        if simplex.count == 3 {
            return None;
        }

        v = simplex.closest_point();
    }

    if iterations == 0 {
        // Initial overlap.
        return None;
    }

    // The simplex is reversed (it tracks B - A), so A's witness comes second.
    let (_point_b, point_a) = simplex.witness_points();
    if v.length_squared() > 0.0 {
        normal = (-v).normalized();
    }

    Some(ShapeCastOutput {
        point: point_a + normal * radius_a,
        normal,
        lambda,
        iterations,
    })
}

/// Exact overlap test via GJK with radii.
pub fn test_overlap(
    shape_a: &Shape,
    index_a: usize,
    shape_b: &Shape,
    index_b: usize,
    xf_a: Transform,
    xf_b: Transform,
) -> bool {
    let proxy_a = DistanceProxy::new(shape_a, index_a);
    let proxy_b = DistanceProxy::new(shape_b, index_b);
    let mut cache = SimplexCache::default();
    let output = distance(
        &mut cache,
        &DistanceInput {
            proxy_a: &proxy_a,
            proxy_b: &proxy_b,
            transform_a: xf_a,
            transform_b: xf_b,
            use_radii: true,
        },
    );
    output.distance < 10.0 * f32::EPSILON
}
