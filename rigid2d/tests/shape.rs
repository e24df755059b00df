use rigid2d::shapes::{self, PolygonShape, ShapeError};
use rigid2d::{Transform, Vec2};

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn circle_mass() {
    let circle = shapes::circle([1.0, 0.0], 1.0);
    let md = circle.compute_mass(1.0);
    assert!(approx(md.mass, std::f32::consts::PI, 1e-5));
    assert!(approx(md.center.x, 1.0, 1e-6));
    assert!(approx(md.center.y, 0.0, 1e-6));
    // Inertia about the origin: 0.5*m*r^2 + m*d^2.
    assert!(approx(md.inertia, 1.5 * std::f32::consts::PI, 1e-4));
}

#[test]
fn box_mass_offset_rotated() {
    // A 1x3 box centered far from the origin; the mass is density * area,
    // the centroid is the given center, and the inertia follows the
    // parallel axis theorem regardless of rotation.
    let hx = 0.5;
    let hy = 1.5;
    let center = Vec2::new(100.0, -50.0);
    let shape = PolygonShape::new_box_at(hx, hy, center, 0.25);
    let md = shape.compute_mass(1.0);

    let mass = 4.0 * hx * hy;
    assert!(approx(md.mass, mass, 1e-4));
    assert!(approx(md.center.x, center.x, 1e-3 + 1e-5 * center.x.abs()));
    assert!(approx(md.center.y, center.y, 1e-3 + 1e-5 * center.y.abs()));

    let inertia = mass / 3.0 * (hx * hx + hy * hy) + mass * center.dot(center);
    assert!(approx(md.inertia, inertia, 40.0 * (1e-3 + 1e-5 * inertia)));
}

#[test]
fn hull_is_convex_ccw_positive_area() {
    // Deliberately unordered input with an interior point.
    let points = [
        Vec2::new(1.0, 1.0),
        Vec2::new(-1.0, 1.0),
        Vec2::new(0.0, 0.0),
        Vec2::new(-1.0, -1.0),
        Vec2::new(1.0, -1.0),
        Vec2::new(0.2, 0.1),
    ];
    let poly = PolygonShape::new(points).unwrap();
    assert_eq!(poly.count, 4);
    assert!(poly.is_convex());
    assert!(poly.area() > 0.0);
    for i in 0..poly.count {
        let j = (i + 1) % poly.count;
        let edge = poly.vertices[j] - poly.vertices[i];
        assert!(edge.length() > f32::EPSILON.sqrt());
    }
}

#[test]
fn hull_welds_near_duplicates() {
    let eps = 0.001; // under half linear slop
    let points = [
        Vec2::new(0.0, 0.0),
        Vec2::new(0.0 + eps, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
    ];
    let poly = PolygonShape::new(points).unwrap();
    assert_eq!(poly.count, 3);
}

#[test]
fn degenerate_polygons_rejected() {
    assert!(matches!(
        PolygonShape::new([[0.0f32, 0.0], [1.0, 0.0]]),
        Err(ShapeError::TooFewVertices(2))
    ));

    // All points weld to one.
    let tiny = 0.0001;
    assert!(matches!(
        PolygonShape::new([[0.0f32, 0.0], [tiny, 0.0], [0.0, tiny]]),
        Err(ShapeError::DegeneratePolygon)
    ));
}

#[test]
fn polygon_point_test_and_ray() {
    let poly = shapes::box_polygon(1.0, 1.0);
    let xf = Transform::from_pos_angle([2.0, 0.0], 0.0);

    assert!(poly.test_point(&xf, Vec2::new(2.5, 0.5)));
    assert!(!poly.test_point(&xf, Vec2::new(4.0, 0.0)));

    let input = rigid2d::RayCastInput {
        p1: Vec2::new(-2.0, 0.0),
        p2: Vec2::new(2.0, 0.0),
        max_fraction: 1.0,
    };
    let hit = poly.ray_cast(&input, &xf).expect("ray hits the box");
    // Enter at x = 1: fraction 3/4 along the segment.
    assert!(approx(hit.fraction, 0.75, 1e-5));
    assert!(approx(hit.normal.x, -1.0, 1e-5));
}

#[test]
fn edge_ray_both_sides() {
    let edge = shapes::edge([0.0, -1.0], [0.0, 1.0]);
    let xf = Transform::IDENTITY;

    let input = rigid2d::RayCastInput {
        p1: Vec2::new(-1.0, 0.0),
        p2: Vec2::new(1.0, 0.0),
        max_fraction: 1.0,
    };
    let hit = edge.ray_cast(&input, &xf).expect("two-sided edge hit");
    assert!(approx(hit.fraction, 0.5, 1e-5));

    // A ray that misses the segment span.
    let input = rigid2d::RayCastInput {
        p1: Vec2::new(-1.0, 2.0),
        p2: Vec2::new(1.0, 2.0),
        max_fraction: 1.0,
    };
    assert!(edge.ray_cast(&input, &xf).is_none());
}

#[test]
fn chain_children_have_ghost_vertices() {
    let chain = rigid2d::ChainShape::new(
        [[0.0f32, 0.0], [1.0, 0.0], [2.0, 0.5], [3.0, 0.5]],
        Vec2::new(-1.0, 0.0),
        Vec2::new(4.0, 0.5),
    )
    .unwrap();
    assert_eq!(chain.edge_count(), 3);

    let middle = chain.child_edge(1);
    assert!(middle.one_sided);
    assert_eq!(middle.vertex0, Vec2::new(0.0, 0.0));
    assert_eq!(middle.vertex3, Vec2::new(3.0, 0.5));

    let first = chain.child_edge(0);
    assert_eq!(first.vertex0, Vec2::new(-1.0, 0.0));
}

#[test]
fn chain_loop_wraps() {
    let chain =
        rigid2d::ChainShape::new_loop([[0.0f32, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]).unwrap();
    assert!(chain.is_loop());
    assert_eq!(chain.edge_count(), 4);
    // The first child's previous ghost is the last distinct vertex.
    let first = chain.child_edge(0);
    assert_eq!(first.vertex0, Vec2::new(0.0, 4.0));
}
