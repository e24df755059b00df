//! Contact manifolds.
//!
//! A manifold stores up to two contact points in the local frame of the
//! reference shape. Point ids are stable across frames so the solver can
//! carry accumulated impulses over (warm starting).

use crate::core::math::Transform;
use crate::tuning;
use crate::types::Vec2;

/// Feature kind referenced by one half of a contact id.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum FeatureType {
    Vertex = 0,
    Face = 1,
}

/// The features that produced a contact point, packed into a key that
/// persists while the same feature pair keeps touching.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactFeature {
    pub index_a: u8,
    pub index_b: u8,
    pub type_a: u8,
    pub type_b: u8,
}

impl ContactFeature {
    pub fn new(index_a: u8, index_b: u8, type_a: FeatureType, type_b: FeatureType) -> Self {
        Self {
            index_a,
            index_b,
            type_a: type_a as u8,
            type_b: type_b as u8,
        }
    }
}

/// Contact point id: the packed feature key. Distinct from the arena handle
/// of a `Contact`; this identifies one point inside a manifold.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactPointId(pub ContactFeature);

impl ContactPointId {
    pub fn key(self) -> u32 {
        u32::from_le_bytes([
            self.0.index_a,
            self.0.index_b,
            self.0.type_a,
            self.0.type_b,
        ])
    }

    /// Swap the A/B halves, for manifolds produced with reversed shapes.
    pub fn swapped(self) -> Self {
        Self(ContactFeature {
            index_a: self.0.index_b,
            index_b: self.0.index_a,
            type_a: self.0.type_b,
            type_b: self.0.type_a,
        })
    }
}

/// One manifold point: anchor in the reference shape's local frame plus the
/// impulses accumulated on it.
#[derive(Copy, Clone, Debug, Default)]
pub struct ManifoldPoint {
    pub local_point: Vec2,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
    pub id: ContactPointId,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ManifoldType {
    Circles,
    FaceA,
    FaceB,
}

/// Contact manifold in the reference shape's local frame.
///
/// - `Circles`: `local_point` is circle A's center, point 0 holds B's center.
/// - `FaceA`: `local_point`/`local_normal` describe A's reference face.
/// - `FaceB`: same, with B as the reference shape.
#[derive(Copy, Clone, Debug)]
pub struct Manifold {
    pub points: [ManifoldPoint; tuning::MAX_MANIFOLD_POINTS],
    pub local_normal: Vec2,
    pub local_point: Vec2,
    pub manifold_type: ManifoldType,
    pub point_count: usize,
}

impl Default for Manifold {
    fn default() -> Self {
        Self {
            points: [ManifoldPoint::default(); tuning::MAX_MANIFOLD_POINTS],
            local_normal: Vec2::ZERO,
            local_point: Vec2::ZERO,
            manifold_type: ManifoldType::Circles,
            point_count: 0,
        }
    }
}

/// World-space view of a manifold: unit normal A->B, world contact points,
/// and per-point separations.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldManifold {
    pub normal: Vec2,
    pub points: [Vec2; tuning::MAX_MANIFOLD_POINTS],
    pub separations: [f32; tuning::MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut out = WorldManifold::default();
        if manifold.point_count == 0 {
            return out;
        }

        match manifold.manifold_type {
            ManifoldType::Circles => {
                out.normal = Vec2::new(1.0, 0.0);
                let point_a = xf_a.transform_point(manifold.local_point);
                let point_b = xf_b.transform_point(manifold.points[0].local_point);
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    out.normal = (point_b - point_a).normalized();
                }
                let c_a = point_a + out.normal * radius_a;
                let c_b = point_b - out.normal * radius_b;
                out.points[0] = (c_a + c_b) * 0.5;
                out.separations[0] = (c_b - c_a).dot(out.normal);
            }
            ManifoldType::FaceA => {
                out.normal = xf_a.q.rotate_vec(manifold.local_normal);
                let plane_point = xf_a.transform_point(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_b.transform_point(manifold.points[i].local_point);
                    let c_a = clip_point
                        + out.normal * (radius_a - (clip_point - plane_point).dot(out.normal));
                    let c_b = clip_point - out.normal * radius_b;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_b - c_a).dot(out.normal);
                }
            }
            ManifoldType::FaceB => {
                let normal = xf_b.q.rotate_vec(manifold.local_normal);
                let plane_point = xf_b.transform_point(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_a.transform_point(manifold.points[i].local_point);
                    let c_b = clip_point
                        + normal * (radius_b - (clip_point - plane_point).dot(normal));
                    let c_a = clip_point - normal * radius_a;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_a - c_b).dot(normal);
                }
                // Point the normal from A to B.
                out.normal = -normal;
            }
        }
        out
    }
}

/// A vertex going through the clipping pipeline, with the id of the feature
/// pair that produced it.
#[derive(Copy, Clone, Debug, Default)]
pub struct ClipVertex {
    pub v: Vec2,
    pub id: ContactPointId,
}

/// Sutherland-Hodgman clipping of a two-vertex segment against the half-plane
/// `dot(normal, x) - offset <= 0`. Returns the number of output vertices; a
/// vertex created at the crossing is tagged with `vertex_index_a`.
pub fn clip_segment_to_line(
    v_out: &mut [ClipVertex; 2],
    v_in: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: usize,
) -> usize {
    let mut count = 0;

    let distance0 = normal.dot(v_in[0].v) - offset;
    let distance1 = normal.dot(v_in[1].v) - offset;

    // Keep points behind the plane.
    if distance0 <= 0.0 {
        v_out[count] = v_in[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        v_out[count] = v_in[1];
        count += 1;
    }

    // The distances straddle zero: emit the crossing point.
    if distance0 * distance1 < 0.0 {
        let interp = distance0 / (distance0 - distance1);
        v_out[count].v = v_in[0].v + (v_in[1].v - v_in[0].v) * interp;
        v_out[count].id = ContactPointId(ContactFeature::new(
            vertex_index_a as u8,
            v_in[0].id.0.index_b,
            FeatureType::Vertex,
            FeatureType::Face,
        ));
        count += 1;
    }

    count
}
