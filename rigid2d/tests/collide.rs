use rigid2d::collision::manifold::{clip_segment_to_line, ClipVertex, Manifold, ManifoldType};
use rigid2d::collision::{collide_circle, collide_edge, collide_polygon, WorldManifold};
use rigid2d::shapes;
use rigid2d::{Transform, Vec2};

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn circles_touching_and_apart() {
    let a = shapes::circle([0.0, 0.0], 1.0);
    let b = shapes::circle([0.0, 0.0], 1.0);

    let mut manifold = Manifold::default();
    collide_circle::collide_circles(
        &mut manifold,
        &a,
        &Transform::IDENTITY,
        &b,
        &Transform::from_pos_angle([1.5, 0.0], 0.0),
    );
    assert_eq!(manifold.manifold_type, ManifoldType::Circles);
    assert_eq!(manifold.point_count, 1);

    collide_circle::collide_circles(
        &mut manifold,
        &a,
        &Transform::IDENTITY,
        &b,
        &Transform::from_pos_angle([3.0, 0.0], 0.0),
    );
    assert_eq!(manifold.point_count, 0);

    // World manifold: normal points A to B, points between surfaces.
    collide_circle::collide_circles(
        &mut manifold,
        &a,
        &Transform::IDENTITY,
        &b,
        &Transform::from_pos_angle([1.5, 0.0], 0.0),
    );
    let world = WorldManifold::new(
        &manifold,
        &Transform::IDENTITY,
        1.0,
        &Transform::from_pos_angle([1.5, 0.0], 0.0),
        1.0,
    );
    assert!(approx(world.normal.x, 1.0, 1e-6));
    assert!(world.separations[0] < 0.0);
}

#[test]
fn polygon_circle_face_and_vertex_regions() {
    let poly = shapes::box_polygon(1.0, 1.0);
    let circle = shapes::circle([0.0, 0.0], 0.5);

    // Face region: circle straight above.
    let mut manifold = Manifold::default();
    collide_circle::collide_polygon_and_circle(
        &mut manifold,
        &poly,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([0.0, 1.4], 0.0),
    );
    assert_eq!(manifold.manifold_type, ManifoldType::FaceA);
    assert_eq!(manifold.point_count, 1);
    assert!(approx(manifold.local_normal.y, 1.0, 1e-6));

    // Vertex region: circle off the corner.
    collide_circle::collide_polygon_and_circle(
        &mut manifold,
        &poly,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([1.3, 1.3], 0.0),
    );
    assert_eq!(manifold.point_count, 1);
    let n = manifold.local_normal;
    assert!(n.x > 0.0 && n.y > 0.0);

    // Far away: no points.
    collide_circle::collide_polygon_and_circle(
        &mut manifold,
        &poly,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([5.0, 0.0], 0.0),
    );
    assert_eq!(manifold.point_count, 0);
}

#[test]
fn polygons_face_clipping_two_points() {
    let a = shapes::box_polygon(1.0, 1.0);
    let b = shapes::box_polygon(1.0, 1.0);

    // Box resting on box with slight overlap.
    let mut manifold = Manifold::default();
    collide_polygon::collide_polygons(
        &mut manifold,
        &a,
        &Transform::IDENTITY,
        &b,
        &Transform::from_pos_angle([0.0, 1.99], 0.0),
    );
    assert_eq!(manifold.point_count, 2);
    // Ids of the two points must differ for warm-start matching.
    assert_ne!(
        manifold.points[0].id.key(),
        manifold.points[1].id.key()
    );

    let world = WorldManifold::new(
        &manifold,
        &Transform::IDENTITY,
        a.radius,
        &Transform::from_pos_angle([0.0, 1.99], 0.0),
        b.radius,
    );
    assert!(approx(world.normal.y.abs(), 1.0, 1e-5));

    // Separated: empty manifold.
    collide_polygon::collide_polygons(
        &mut manifold,
        &a,
        &Transform::IDENTITY,
        &b,
        &Transform::from_pos_angle([0.0, 3.0], 0.0),
    );
    assert_eq!(manifold.point_count, 0);
}

#[test]
fn manifold_ids_stable_across_frames() {
    let a = shapes::box_polygon(1.0, 1.0);
    let b = shapes::box_polygon(1.0, 1.0);

    let mut first = Manifold::default();
    collide_polygon::collide_polygons(
        &mut first,
        &a,
        &Transform::IDENTITY,
        &b,
        &Transform::from_pos_angle([0.1, 1.99], 0.0),
    );
    let mut second = Manifold::default();
    collide_polygon::collide_polygons(
        &mut second,
        &a,
        &Transform::IDENTITY,
        &b,
        &Transform::from_pos_angle([0.11, 1.99], 0.0),
    );
    assert_eq!(first.point_count, 2);
    assert_eq!(second.point_count, 2);
    for i in 0..2 {
        assert_eq!(first.points[i].id, second.points[i].id);
    }
}

#[test]
fn edge_circle_regions() {
    let edge = shapes::edge([-1.0, 0.0], [1.0, 0.0]);
    let circle = shapes::circle([0.0, 0.0], 0.3);

    // Mid-span: face manifold.
    let mut manifold = Manifold::default();
    collide_edge::collide_edge_and_circle(
        &mut manifold,
        &edge,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([0.0, 0.25], 0.0),
    );
    assert_eq!(manifold.point_count, 1);
    assert_eq!(manifold.manifold_type, ManifoldType::FaceA);

    // Past an endpoint: vertex (circles) manifold.
    collide_edge::collide_edge_and_circle(
        &mut manifold,
        &edge,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([1.1, 0.1], 0.0),
    );
    assert_eq!(manifold.point_count, 1);
    assert_eq!(manifold.manifold_type, ManifoldType::Circles);

    // Far beyond the radius: nothing.
    collide_edge::collide_edge_and_circle(
        &mut manifold,
        &edge,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([0.0, 2.0], 0.0),
    );
    assert_eq!(manifold.point_count, 0);
}

#[test]
fn one_sided_edge_skips_back_side() {
    // Ghost vertices make the edge part of a smooth left-to-right chain
    // whose outward normal points down; approaches from above are skipped.
    let edge = shapes::EdgeShape::one_sided(
        [-2.0, 0.0],
        [-1.0, 0.0],
        [1.0, 0.0],
        [2.0, 0.0],
    );
    let circle = shapes::circle([0.0, 0.0], 0.3);

    let mut manifold = Manifold::default();
    collide_edge::collide_edge_and_circle(
        &mut manifold,
        &edge,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([0.0, 0.25], 0.0),
    );
    assert_eq!(manifold.point_count, 0);

    // The front side still collides.
    collide_edge::collide_edge_and_circle(
        &mut manifold,
        &edge,
        &Transform::IDENTITY,
        &circle,
        &Transform::from_pos_angle([0.0, -0.25], 0.0),
    );
    assert_eq!(manifold.point_count, 1);
}

#[test]
fn edge_polygon_produces_manifold() {
    let edge = shapes::edge([-2.0, 0.0], [2.0, 0.0]);
    let poly = shapes::box_polygon(0.5, 0.5);

    let mut manifold = Manifold::default();
    collide_edge::collide_edge_and_polygon(
        &mut manifold,
        &edge,
        &Transform::IDENTITY,
        &poly,
        &Transform::from_pos_angle([0.0, 0.49], 0.0),
    );
    assert!(manifold.point_count > 0);

    collide_edge::collide_edge_and_polygon(
        &mut manifold,
        &edge,
        &Transform::IDENTITY,
        &poly,
        &Transform::from_pos_angle([0.0, 3.0], 0.0),
    );
    assert_eq!(manifold.point_count, 0);
}

#[test]
fn clip_segment_behavior() {
    let v_in = [
        ClipVertex {
            v: Vec2::new(-1.0, 0.0),
            ..Default::default()
        },
        ClipVertex {
            v: Vec2::new(1.0, 0.0),
            ..Default::default()
        },
    ];

    // Plane x <= 0 keeps the left vertex and produces a crossing point.
    let mut v_out = [ClipVertex::default(); 2];
    let n = clip_segment_to_line(&mut v_out, &v_in, Vec2::new(1.0, 0.0), 0.0, 3);
    assert_eq!(n, 2);
    assert!(approx(v_out[0].v.x, -1.0, 1e-6));
    assert!(approx(v_out[1].v.x, 0.0, 1e-6));
    // The synthesized vertex carries the splitting vertex index.
    assert_eq!(v_out[1].id.0.index_a, 3);

    // Fully behind the plane: both vertices survive.
    let n = clip_segment_to_line(&mut v_out, &v_in, Vec2::new(1.0, 0.0), 2.0, 0);
    assert_eq!(n, 2);

    // Fully in front: nothing survives.
    let n = clip_segment_to_line(&mut v_out, &v_in, Vec2::new(1.0, 0.0), -2.0, 0);
    assert_eq!(n, 0);
}
