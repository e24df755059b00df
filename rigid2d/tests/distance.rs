use rigid2d::collision::{
    distance, shape_cast, test_overlap, DistanceInput, DistanceProxy, ShapeCastInput, SimplexCache,
};
use rigid2d::shapes::{self, PolygonShape};
use rigid2d::{Shape, Transform, Vec2};

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

fn gjk(
    proxy_a: &DistanceProxy,
    xf_a: Transform,
    proxy_b: &DistanceProxy,
    xf_b: Transform,
    use_radii: bool,
) -> rigid2d::collision::DistanceOutput {
    let mut cache = SimplexCache::default();
    distance(
        &mut cache,
        &DistanceInput {
            proxy_a,
            proxy_b,
            transform_a: xf_a,
            transform_b: xf_b,
            use_radii,
        },
    )
}

// Exact reference for convex polygons: the minimum over all vertex-edge
// distances of both windings.
fn brute_force_distance(a: &PolygonShape, xf_a: &Transform, b: &PolygonShape, xf_b: &Transform) -> f32 {
    let verts_a: Vec<Vec2> = (0..a.count).map(|i| xf_a.transform_point(a.vertices[i])).collect();
    let verts_b: Vec<Vec2> = (0..b.count).map(|i| xf_b.transform_point(b.vertices[i])).collect();

    fn point_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
        let ab = b - a;
        let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
        (p - (a + ab * t)).length()
    }

    let mut best = f32::MAX;
    for (verts1, verts2) in [(&verts_a, &verts_b), (&verts_b, &verts_a)] {
        for &p in verts1.iter() {
            for i in 0..verts2.len() {
                let j = (i + 1) % verts2.len();
                best = best.min(point_segment(p, verts2[i], verts2[j]));
            }
        }
    }
    best
}

#[test]
fn distance_is_symmetric() {
    let poly_a = shapes::box_polygon(1.0, 1.0);
    let poly_b = shapes::box_polygon(0.5, 2.0);
    let proxy_a = DistanceProxy::new(&Shape::Polygon(poly_a), 0);
    let proxy_b = DistanceProxy::new(&Shape::Polygon(poly_b), 0);

    let xf_a = Transform::from_pos_angle([0.0, 0.0], 0.3);
    let xf_b = Transform::from_pos_angle([4.0, 1.0], -0.7);

    let ab = gjk(&proxy_a, xf_a, &proxy_b, xf_b, false);
    let ba = gjk(&proxy_b, xf_b, &proxy_a, xf_a, false);
    assert!(approx(ab.distance, ba.distance, 1e-5));

    // Witness points realize the reported distance.
    assert!(approx(ab.point_a.distance(ab.point_b), ab.distance, 1e-5));
}

#[test]
fn thin_boxes_known_pose() {
    let poly_a = shapes::box_polygon(10.0, 0.2);
    let poly_b = shapes::box_polygon(2.0, 0.1);
    let xf_a = Transform::from_pos_angle([0.0, -0.2], 0.0);
    let xf_b = Transform::from_pos_angle([12.017_401, 0.136_785_08], -0.010_926_5);

    let proxy_a = DistanceProxy::new(&Shape::Polygon(poly_a), 0);
    let proxy_b = DistanceProxy::new(&Shape::Polygon(poly_b), 0);

    let output = gjk(&proxy_a, xf_a, &proxy_b, xf_b, false);
    let expected = brute_force_distance(&poly_a, &xf_a, &poly_b, &xf_b);

    assert!(output.distance > 0.0);
    assert!(approx(output.distance, expected, 4.0 * 1e-4));
    assert!(output.iterations < 20);
}

#[test]
fn circles_distance_with_radii() {
    let circle_a = shapes::circle([0.0, 0.0], 1.0);
    let circle_b = shapes::circle([0.0, 0.0], 0.5);
    let proxy_a = DistanceProxy::new(&Shape::Circle(circle_a), 0);
    let proxy_b = DistanceProxy::new(&Shape::Circle(circle_b), 0);

    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_pos_angle([4.0, 0.0], 0.0);

    // Center distance without radii.
    let centers = gjk(&proxy_a, xf_a, &proxy_b, xf_b, false);
    assert!(approx(centers.distance, 4.0, 1e-5));

    // Surface distance with radii.
    let surfaces = gjk(&proxy_a, xf_a, &proxy_b, xf_b, true);
    assert!(approx(surfaces.distance, 2.5, 1e-5));

    // Overlapping when radii apply: distance collapses to zero.
    let xf_b = Transform::from_pos_angle([1.2, 0.0], 0.0);
    let overlap = gjk(&proxy_a, xf_a, &proxy_b, xf_b, true);
    assert!(approx(overlap.distance, 0.0, 1e-6));
    assert_eq!(overlap.point_a, overlap.point_b);
}

#[test]
fn overlap_test_symmetric_reflexive() {
    let shape_a: Shape = shapes::box_polygon(1.0, 1.0).into();
    let shape_b: Shape = shapes::circle([0.0, 0.0], 1.0).into();
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_pos_angle([1.5, 0.0], 0.0);

    assert!(test_overlap(&shape_a, 0, &shape_a, 0, xf_a, xf_a));
    assert_eq!(
        test_overlap(&shape_a, 0, &shape_b, 0, xf_a, xf_b),
        test_overlap(&shape_b, 0, &shape_a, 0, xf_b, xf_a)
    );

    let far = Transform::from_pos_angle([10.0, 0.0], 0.0);
    assert!(!test_overlap(&shape_a, 0, &shape_b, 0, xf_a, far));
}

#[test]
fn shape_cast_zero_translation() {
    let circle = shapes::circle([0.0, 0.0], 0.5);
    let proxy = DistanceProxy::new(&Shape::Circle(circle), 0);

    let output = shape_cast(&ShapeCastInput {
        proxy_a: &proxy,
        proxy_b: &proxy,
        transform_a: Transform::IDENTITY,
        transform_b: Transform::from_pos_angle([5.0, 0.0], 0.0),
        translation_b: Vec2::ZERO,
    });
    // Separated shapes with no motion: either a miss or lambda zero.
    if let Some(hit) = output {
        assert!(approx(hit.lambda, 0.0, 1e-6));
    }
}

#[test]
fn shape_cast_hits_along_translation() {
    let circle = shapes::circle([0.0, 0.0], 0.5);
    let proxy = DistanceProxy::new(&Shape::Circle(circle), 0);

    let output = shape_cast(&ShapeCastInput {
        proxy_a: &proxy,
        proxy_b: &proxy,
        transform_a: Transform::IDENTITY,
        transform_b: Transform::from_pos_angle([5.0, 0.0], 0.0),
        translation_b: Vec2::new(-8.0, 0.0),
    })
    .expect("cast should hit");

    // Surfaces touch after closing 4 of the 8 units of travel.
    assert!(approx(output.lambda, 0.5, 0.02));
    assert!(output.normal.x > 0.9);

    // Casting away is a miss.
    let miss = shape_cast(&ShapeCastInput {
        proxy_a: &proxy,
        proxy_b: &proxy,
        transform_a: Transform::IDENTITY,
        transform_b: Transform::from_pos_angle([5.0, 0.0], 0.0),
        translation_b: Vec2::new(8.0, 0.0),
    });
    assert!(miss.is_none());
}

#[test]
fn warm_started_cache_converges_fast() {
    let poly = shapes::box_polygon(1.0, 1.0);
    let proxy = DistanceProxy::new(&Shape::Polygon(poly), 0);
    let xf_a = Transform::IDENTITY;

    let mut cache = SimplexCache::default();
    let mut last_iterations = usize::MAX;
    for i in 0..3 {
        let xf_b = Transform::from_pos_angle([5.0 + 0.01 * i as f32, 0.2], 0.0);
        let output = distance(
            &mut cache,
            &DistanceInput {
                proxy_a: &proxy,
                proxy_b: &proxy,
                transform_a: xf_a,
                transform_b: xf_b,
                use_radii: false,
            },
        );
        last_iterations = output.iterations;
    }
    // Re-querying a nearly identical pose resolves from the cached witness.
    assert!(last_iterations <= 2);
}
