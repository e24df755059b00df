//! Polygon-vs-polygon manifold via reference/incident face clipping.

use crate::collision::manifold::{
    clip_segment_to_line, ClipVertex, ContactFeature, ContactPointId, FeatureType, Manifold,
    ManifoldType,
};
use crate::core::math::Transform;
use crate::shapes::PolygonShape;
use crate::tuning;

/// Max separation of poly1's faces against poly2, iterating poly1's normals
/// in poly2's frame and taking the min vertex-vs-plane distance per face.
pub(crate) fn find_max_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> (usize, f32) {
    let xf = xf2.inv_mul(*xf1);

    let mut best_index = 0;
    let mut max_separation = f32::MIN;
    for i in 0..poly1.count {
        // poly1's face normal and vertex in poly2's frame.
        let n = xf.q.rotate_vec(poly1.normals[i]);
        let v1 = xf.transform_point(poly1.vertices[i]);

        let mut si = f32::MAX;
        for j in 0..poly2.count {
            let sij = n.dot(poly2.vertices[j] - v1);
            si = si.min(sij);
        }

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (best_index, max_separation)
}

/// Edge of poly2 whose normal is most anti-parallel to poly1's face `edge1`.
fn find_incident_edge(
    c: &mut [ClipVertex; 2],
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) {
    debug_assert!(edge1 < poly1.count);

    // Reference normal in poly2's frame.
    let normal1 = xf2.q.inv_rotate_vec(xf1.q.rotate_vec(poly1.normals[edge1]));

    let mut index = 0;
    let mut min_dot = f32::MAX;
    for i in 0..poly2.count {
        let dot = normal1.dot(poly2.normals[i]);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = (i1 + 1) % poly2.count;

    c[0] = ClipVertex {
        v: xf2.transform_point(poly2.vertices[i1]),
        id: ContactPointId(ContactFeature::new(
            edge1 as u8,
            i1 as u8,
            FeatureType::Face,
            FeatureType::Vertex,
        )),
    };
    c[1] = ClipVertex {
        v: xf2.transform_point(poly2.vertices[i2]),
        id: ContactPointId(ContactFeature::new(
            edge1 as u8,
            i2 as u8,
            FeatureType::Face,
            FeatureType::Vertex,
        )),
    };
}

pub fn collide_polygons(
    manifold: &mut Manifold,
    poly_a: &PolygonShape,
    xf_a: &Transform,
    poly_b: &PolygonShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;
    let total_radius = poly_a.radius + poly_b.radius;

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return;
    }

    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return;
    }

    // Pick the reference polygon; hysteresis reduces face flip-flopping.
    let k_tol = 0.1 * tuning::LINEAR_SLOP;
    let (poly1, poly2, xf1, xf2, edge1, flip) = if separation_b > separation_a + k_tol {
        (poly_b, poly_a, xf_b, xf_a, edge_b, true)
    } else {
        (poly_a, poly_b, xf_a, xf_b, edge_a, false)
    };

    let mut incident_edge = [ClipVertex::default(); 2];
    find_incident_edge(&mut incident_edge, poly1, xf1, edge1, poly2, xf2);

    let iv1 = edge1;
    let iv2 = (edge1 + 1) % poly1.count;

    let mut v11 = poly1.vertices[iv1];
    let mut v12 = poly1.vertices[iv2];

    let local_tangent = (v12 - v11).normalized();
    let local_normal = local_tangent.cross_scalar(1.0);
    let plane_point = (v11 + v12) * 0.5;

    let tangent = xf1.q.rotate_vec(local_tangent);
    let normal = tangent.cross_scalar(1.0);

    v11 = xf1.transform_point(v11);
    v12 = xf1.transform_point(v12);

    // Side offsets, extruded by the total radius.
    let front_offset = normal.dot(v11);
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    // Clip the incident edge against the extruded side planes of edge1.
    let mut clip_points1 = [ClipVertex::default(); 2];
    let mut clip_points2 = [ClipVertex::default(); 2];

    let np = clip_segment_to_line(&mut clip_points1, &incident_edge, -tangent, side_offset1, iv1);
    if np < 2 {
        return;
    }
    let np = clip_segment_to_line(&mut clip_points2, &clip_points1, tangent, side_offset2, iv2);
    if np < 2 {
        return;
    }

    manifold.manifold_type = if flip {
        ManifoldType::FaceB
    } else {
        ManifoldType::FaceA
    };
    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    let mut point_count = 0;
    for cp in clip_points2.iter().take(tuning::MAX_MANIFOLD_POINTS) {
        let separation = normal.dot(cp.v) - front_offset;
        if separation <= total_radius {
            let point = &mut manifold.points[point_count];
            point.local_point = xf2.inv_transform_point(cp.v);
            point.id = if flip { cp.id.swapped() } else { cp.id };
            point.normal_impulse = 0.0;
            point.tangent_impulse = 0.0;
            point_count += 1;
        }
    }
    manifold.point_count = point_count;
}
