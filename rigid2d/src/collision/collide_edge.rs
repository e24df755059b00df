//! Edge-vs-circle and edge-vs-polygon manifolds.
//!
//! One-sided edges come from chains; their ghost vertices are used to decide
//! whether a contact at a shared chain vertex belongs to this edge or to its
//! neighbor, which suppresses ghost collisions when sliding across joints.

use crate::collision::manifold::{
    clip_segment_to_line, ClipVertex, ContactFeature, ContactPointId, FeatureType, Manifold,
    ManifoldType,
};
use crate::core::math::Transform;
use crate::shapes::{CircleShape, EdgeShape, PolygonShape};
use crate::tuning;
use crate::types::Vec2;

pub fn collide_edge_and_circle(
    manifold: &mut Manifold,
    edge_a: &EdgeShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    // Circle in the edge's frame.
    let q = xf_a.inv_transform_point(xf_b.transform_point(circle_b.position));

    let a = edge_a.vertex1;
    let b = edge_a.vertex2;
    let e = b - a;

    // Normal points to the right for a CCW winding.
    let n = Vec2::new(e.y, -e.x);
    let offset = n.dot(q - a);

    if edge_a.one_sided && offset < 0.0 {
        return;
    }

    // Barycentric coordinates of q on the segment.
    let u = e.dot(b - q);
    let v = e.dot(q - a);

    let radius = tuning::POLYGON_RADIUS + circle_b.radius;

    // Region A
    if v <= 0.0 {
        let p = a;
        if q.distance_squared(p) > radius * radius {
            return;
        }

        // If the circle sits in the span of the previous edge, that edge owns
        // the contact.
        if edge_a.one_sided {
            let a1 = edge_a.vertex0;
            let b1 = a;
            let e1 = b1 - a1;
            let u1 = e1.dot(b1 - q);
            if u1 > 0.0 {
                return;
            }
        }

        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::Circles;
        manifold.local_normal = Vec2::ZERO;
        manifold.local_point = p;
        manifold.points[0].id = ContactPointId(ContactFeature::new(
            0,
            0,
            FeatureType::Vertex,
            FeatureType::Vertex,
        ));
        manifold.points[0].local_point = circle_b.position;
        return;
    }

    // Region B
    if u <= 0.0 {
        let p = b;
        if q.distance_squared(p) > radius * radius {
            return;
        }

        if edge_a.one_sided {
            let b2 = edge_a.vertex3;
            let a2 = b;
            let e2 = b2 - a2;
            let v2 = e2.dot(q - a2);
            if v2 > 0.0 {
                return;
            }
        }

        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::Circles;
        manifold.local_normal = Vec2::ZERO;
        manifold.local_point = p;
        manifold.points[0].id = ContactPointId(ContactFeature::new(
            1,
            0,
            FeatureType::Vertex,
            FeatureType::Vertex,
        ));
        manifold.points[0].local_point = circle_b.position;
        return;
    }

    // Region AB
    let den = e.length_squared();
    debug_assert!(den > 0.0);
    let p = (a * u + b * v) * (1.0 / den);
    if q.distance_squared(p) > radius * radius {
        return;
    }

    let mut normal = n;
    if offset < 0.0 {
        normal = -normal;
    }
    normal.normalize();

    manifold.point_count = 1;
    manifold.manifold_type = ManifoldType::FaceA;
    manifold.local_normal = normal;
    manifold.local_point = a;
    manifold.points[0].id = ContactPointId(ContactFeature::new(
        0,
        0,
        FeatureType::Face,
        FeatureType::Vertex,
    ));
    manifold.points[0].local_point = circle_b.position;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum EpAxisType {
    EdgeA,
    EdgeB,
}

#[derive(Copy, Clone, Debug)]
struct EpAxis {
    axis_type: EpAxisType,
    index: usize,
    separation: f32,
    normal: Vec2,
}

// Polygon B expressed in the edge's frame.
struct TempPolygon {
    vertices: [Vec2; tuning::MAX_POLYGON_VERTICES],
    normals: [Vec2; tuning::MAX_POLYGON_VERTICES],
    count: usize,
}

fn compute_edge_separation(polygon_b: &TempPolygon, v1: Vec2, normal1: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        axis_type: EpAxisType::EdgeA,
        index: 0,
        separation: f32::MIN,
        normal: Vec2::ZERO,
    };

    let axes = [normal1, -normal1];

    // Least-overlap axis over the two edge normals.
    for (j, axis_j) in axes.iter().enumerate() {
        let mut sj = f32::MAX;
        for i in 0..polygon_b.count {
            let si = axis_j.dot(polygon_b.vertices[i] - v1);
            sj = sj.min(si);
        }
        if sj > axis.separation {
            axis.index = j;
            axis.separation = sj;
            axis.normal = *axis_j;
        }
    }
    axis
}

fn compute_polygon_separation(polygon_b: &TempPolygon, v1: Vec2, v2: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        axis_type: EpAxisType::EdgeB,
        index: 0,
        separation: f32::MIN,
        normal: Vec2::ZERO,
    };

    for i in 0..polygon_b.count {
        let n = -polygon_b.normals[i];
        let s1 = n.dot(polygon_b.vertices[i] - v1);
        let s2 = n.dot(polygon_b.vertices[i] - v2);
        let s = s1.min(s2);
        if s > axis.separation {
            axis.index = i;
            axis.separation = s;
            axis.normal = n;
        }
    }
    axis
}

pub fn collide_edge_and_polygon(
    manifold: &mut Manifold,
    edge_a: &EdgeShape,
    xf_a: &Transform,
    polygon_b: &PolygonShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    let xf = xf_a.inv_mul(*xf_b);

    let centroid_b = xf.transform_point(polygon_b.centroid);

    let v1 = edge_a.vertex1;
    let v2 = edge_a.vertex2;

    let edge1 = (v2 - v1).normalized();

    // Normal points to the right for a CCW winding.
    let normal1 = Vec2::new(edge1.y, -edge1.x);
    let offset1 = normal1.dot(centroid_b - v1);

    let one_sided = edge_a.one_sided;
    if one_sided && offset1 < 0.0 {
        return;
    }

    let mut temp = TempPolygon {
        vertices: [Vec2::ZERO; tuning::MAX_POLYGON_VERTICES],
        normals: [Vec2::ZERO; tuning::MAX_POLYGON_VERTICES],
        count: polygon_b.count,
    };
    for i in 0..polygon_b.count {
        temp.vertices[i] = xf.transform_point(polygon_b.vertices[i]);
        temp.normals[i] = xf.q.rotate_vec(polygon_b.normals[i]);
    }

    let radius = polygon_b.radius + tuning::POLYGON_RADIUS;

    let edge_axis = compute_edge_separation(&temp, v1, normal1);
    if edge_axis.separation > radius {
        return;
    }

    let polygon_axis = compute_polygon_separation(&temp, v1, v2);
    if polygon_axis.separation > radius {
        return;
    }

    // Hysteresis toward the edge axis for jitter reduction.
    let k_relative_tol = 0.98;
    let k_absolute_tol = 0.001;
    let mut primary_axis =
        if polygon_axis.separation - radius > k_relative_tol * (edge_axis.separation - radius) + k_absolute_tol {
            polygon_axis
        } else {
            edge_axis
        };

    if one_sided {
        // Gauss-map wedge classification against the adjacent ghost edges.
        let edge0 = (v1 - edge_a.vertex0).normalized();
        let normal0 = Vec2::new(edge0.y, -edge0.x);
        let convex1 = edge0.cross(edge1) >= 0.0;

        let edge2 = (edge_a.vertex3 - v2).normalized();
        let normal2 = Vec2::new(edge2.y, -edge2.x);
        let convex2 = edge1.cross(edge2) >= 0.0;

        const SIN_TOL: f32 = 0.1;
        let side1 = primary_axis.normal.dot(edge1) <= 0.0;

        if side1 {
            if convex1 {
                if primary_axis.normal.cross(normal0) > SIN_TOL {
                    // Skip region: the neighbor owns this direction.
                    return;
                }
            } else {
                // Reflex corner: snap to the edge axis.
                primary_axis = edge_axis;
            }
        } else if convex2 {
            if normal2.cross(primary_axis.normal) > SIN_TOL {
                return;
            }
        } else {
            primary_axis = edge_axis;
        }
    }

    let mut clip_points = [ClipVertex::default(); 2];
    let ref_i1;
    let ref_i2;
    let ref_v1;
    let ref_v2;
    let ref_normal;
    let side_normal1;
    let side_normal2;

    if primary_axis.axis_type == EpAxisType::EdgeA {
        manifold.manifold_type = ManifoldType::FaceA;

        // Incident edge: polygon normal most anti-parallel to the edge normal.
        let mut best_index = 0;
        let mut best_value = primary_axis.normal.dot(temp.normals[0]);
        for i in 1..temp.count {
            let value = primary_axis.normal.dot(temp.normals[i]);
            if value < best_value {
                best_value = value;
                best_index = i;
            }
        }

        let i1 = best_index;
        let i2 = if i1 + 1 < temp.count { i1 + 1 } else { 0 };

        clip_points[0] = ClipVertex {
            v: temp.vertices[i1],
            id: ContactPointId(ContactFeature::new(
                0,
                i1 as u8,
                FeatureType::Face,
                FeatureType::Vertex,
            )),
        };
        clip_points[1] = ClipVertex {
            v: temp.vertices[i2],
            id: ContactPointId(ContactFeature::new(
                0,
                i2 as u8,
                FeatureType::Face,
                FeatureType::Vertex,
            )),
        };

        ref_i1 = 0;
        ref_i2 = 1;
        ref_v1 = v1;
        ref_v2 = v2;
        ref_normal = primary_axis.normal;
        side_normal1 = -edge1;
        side_normal2 = edge1;
    } else {
        manifold.manifold_type = ManifoldType::FaceB;

        clip_points[0] = ClipVertex {
            v: v2,
            id: ContactPointId(ContactFeature::new(
                1,
                primary_axis.index as u8,
                FeatureType::Vertex,
                FeatureType::Face,
            )),
        };
        clip_points[1] = ClipVertex {
            v: v1,
            id: ContactPointId(ContactFeature::new(
                0,
                primary_axis.index as u8,
                FeatureType::Vertex,
                FeatureType::Face,
            )),
        };

        ref_i1 = primary_axis.index;
        ref_i2 = if ref_i1 + 1 < temp.count { ref_i1 + 1 } else { 0 };
        ref_v1 = temp.vertices[ref_i1];
        ref_v2 = temp.vertices[ref_i2];
        ref_normal = temp.normals[ref_i1];

        // CCW winding
        side_normal1 = Vec2::new(ref_normal.y, -ref_normal.x);
        side_normal2 = -side_normal1;
    }

    let side_offset1 = side_normal1.dot(ref_v1);
    let side_offset2 = side_normal2.dot(ref_v2);

    let mut clip_points1 = [ClipVertex::default(); 2];
    let mut clip_points2 = [ClipVertex::default(); 2];

    let np = clip_segment_to_line(&mut clip_points1, &clip_points, side_normal1, side_offset1, ref_i1);
    if np < tuning::MAX_MANIFOLD_POINTS {
        return;
    }
    let np = clip_segment_to_line(&mut clip_points2, &clip_points1, side_normal2, side_offset2, ref_i2);
    if np < tuning::MAX_MANIFOLD_POINTS {
        return;
    }

    if primary_axis.axis_type == EpAxisType::EdgeA {
        manifold.local_normal = ref_normal;
        manifold.local_point = ref_v1;
    } else {
        manifold.local_normal = polygon_b.normals[ref_i1];
        manifold.local_point = polygon_b.vertices[ref_i1];
    }

    let mut point_count = 0;
    for cp in clip_points2.iter().take(tuning::MAX_MANIFOLD_POINTS) {
        let separation = ref_normal.dot(cp.v - ref_v1);
        if separation <= radius {
            let point = &mut manifold.points[point_count];
            if primary_axis.axis_type == EpAxisType::EdgeA {
                point.local_point = xf.inv_transform_point(cp.v);
                point.id = cp.id;
            } else {
                point.local_point = cp.v;
                point.id = cp.id.swapped();
            }
            point_count += 1;
        }
    }
    manifold.point_count = point_count;
}
