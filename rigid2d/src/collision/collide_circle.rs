//! Circle-vs-circle and polygon-vs-circle manifolds.

use crate::collision::manifold::{
    ContactFeature, ContactPointId, FeatureType, Manifold, ManifoldType,
};
use crate::core::math::Transform;
use crate::shapes::{CircleShape, PolygonShape};

pub fn collide_circles(
    manifold: &mut Manifold,
    circle_a: &CircleShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    let p_a = xf_a.transform_point(circle_a.position);
    let p_b = xf_b.transform_point(circle_b.position);

    let dist_sq = p_a.distance_squared(p_b);
    let radius = circle_a.radius + circle_b.radius;
    if dist_sq > radius * radius {
        return;
    }

    manifold.manifold_type = ManifoldType::Circles;
    manifold.local_point = circle_a.position;
    manifold.local_normal = crate::types::Vec2::ZERO;
    manifold.point_count = 1;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactPointId::default();
}

pub fn collide_polygon_and_circle(
    manifold: &mut Manifold,
    polygon_a: &PolygonShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) {
    manifold.point_count = 0;

    // Circle center in the polygon's frame.
    let c = xf_b.transform_point(circle_b.position);
    let c_local = xf_a.inv_transform_point(c);

    let radius = polygon_a.radius + circle_b.radius;

    // Find the face of maximum penetration.
    let mut normal_index = 0;
    let mut separation = f32::MIN;
    for i in 0..polygon_a.count {
        let s = polygon_a.normals[i].dot(c_local - polygon_a.vertices[i]);
        if s > radius {
            // Early out.
            return;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = polygon_a.vertices[normal_index];
    let v2 = polygon_a.vertices[(normal_index + 1) % polygon_a.count];

    if separation < f32::EPSILON {
        // Center inside the polygon: use the deepest face directly.
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = polygon_a.normals[normal_index];
        manifold.local_point = (v1 + v2) * 0.5;
        manifold.points[0].local_point = circle_b.position;
        manifold.points[0].id = ContactPointId::default();
        return;
    }

    // Barycentric regions of the face: clamp to a vertex or keep the face.
    let u1 = (c_local - v1).dot(v2 - v1);
    let u2 = (c_local - v2).dot(v1 - v2);
    if u1 <= 0.0 {
        if c_local.distance_squared(v1) > radius * radius {
            return;
        }
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = (c_local - v1).normalized();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(v2) > radius * radius {
            return;
        }
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = (c_local - v2).normalized();
        manifold.local_point = v2;
    } else {
        let face_center = (v1 + v2) * 0.5;
        let s = (c_local - face_center).dot(polygon_a.normals[normal_index]);
        if s > radius {
            return;
        }
        manifold.point_count = 1;
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_normal = polygon_a.normals[normal_index];
        manifold.local_point = face_center;
    }
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactPointId(ContactFeature::new(
        0,
        0,
        FeatureType::Vertex,
        FeatureType::Vertex,
    ));
}
