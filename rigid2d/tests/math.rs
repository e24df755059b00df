use rigid2d::{Rot, Sweep, Transform, Vec2};

fn approx(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn transform_composition_and_inverse() {
    let t1 = Transform::from_pos_angle([-2.0, 3.0], 1.0);
    let t2 = Transform::from_pos_angle([1.0, 0.0], -2.0);

    let two = Vec2::new(2.0, 2.0);
    let v1 = t1.transform_point(two);
    let v12 = t2.transform_point(v1);
    let vcomp = t2.mul(t1).transform_point(two);
    assert!(approx(v12.x, vcomp.x, 1e-5));
    assert!(approx(v12.y, vcomp.y, 1e-5));

    // Inverse transform round-trips.
    let back = t1.inv_transform_point(v1);
    assert!(approx(back.x, two.x, 1e-5));
    assert!(approx(back.y, two.y, 1e-5));

    // inv_mul composes with mul to identity.
    let rel = t1.inv_mul(t2);
    let recomposed = t1.mul(rel);
    assert!(approx(recomposed.p.x, t2.p.x, 1e-5));
    assert!(approx(recomposed.p.y, t2.p.y, 1e-5));
    assert!(approx(recomposed.q.angle(), t2.q.angle(), 1e-5));
}

#[test]
fn rotation_roundtrip() {
    for i in -50..50 {
        let angle = i as f32 * 0.1;
        let q = Rot::from_radians(angle);
        let v = q.rotate_vec(Vec2::new(1.0, 0.0));
        assert!(approx(v.x, angle.cos(), 1e-6));
        assert!(approx(v.y, angle.sin(), 1e-6));

        let w = q.inv_rotate_vec(v);
        assert!(approx(w.x, 1.0, 1e-5));
        assert!(approx(w.y, 0.0, 1e-5));
    }
}

#[test]
fn vec2_ops() {
    let a = Vec2::new(3.0, 4.0);
    assert!(approx(a.length(), 5.0, 1e-6));
    assert!(approx(a.normalized().length(), 1.0, 1e-6));
    assert!(approx(a.dot(Vec2::new(-4.0, 3.0)), 0.0, 1e-6));
    assert!(approx(a.cross(Vec2::new(1.0, 0.0)), -4.0, 1e-6));
    assert!(approx(a.skew().dot(a), 0.0, 1e-6));
}

// The sweep stores the center of mass path; with a zero local center the
// endpoint transforms must reproduce the endpoint states exactly.
#[test]
fn sweep_transform_endpoints() {
    let sweep = Sweep {
        local_center: Vec2::ZERO,
        c0: Vec2::new(-2.0, 4.0),
        c: Vec2::new(3.0, 8.0),
        a0: 0.5,
        a: 5.0,
        alpha0: 0.0,
    };

    let xf0 = sweep.transform(0.0);
    assert!(approx(xf0.p.x, -2.0, 1e-6));
    assert!(approx(xf0.p.y, 4.0, 1e-6));
    assert!(approx(xf0.q.c, 0.5f32.cos(), 1e-6));

    let xf1 = sweep.transform(1.0);
    assert!(approx(xf1.p.x, 3.0, 1e-6));
    assert!(approx(xf1.p.y, 8.0, 1e-6));
    assert!(approx(xf1.q.c, 5.0f32.cos(), 1e-6));
}

#[test]
fn sweep_advance_preserves_endpoint() {
    let mut sweep = Sweep {
        local_center: Vec2::ZERO,
        c0: Vec2::new(0.0, 0.0),
        c: Vec2::new(10.0, 0.0),
        a0: 0.0,
        a: 1.0,
        alpha0: 0.0,
    };
    sweep.advance(0.5);
    assert!(approx(sweep.alpha0, 0.5, 1e-6));
    assert!(approx(sweep.c0.x, 5.0, 1e-5));
    // The end state is untouched.
    assert!(approx(sweep.c.x, 10.0, 1e-6));
    assert!(approx(sweep.a, 1.0, 1e-6));
}

#[cfg(feature = "serde")]
#[test]
fn value_types_serialize() {
    let v = Vec2::new(1.5, -2.5);
    let json = serde_json::to_string(&v).unwrap();
    let back: Vec2 = serde_json::from_str(&json).unwrap();
    assert_eq!(v, back);

    let xf = Transform::from_pos_angle([1.0, 2.0], 0.3);
    let json = serde_json::to_string(&xf).unwrap();
    let back: Transform = serde_json::from_str(&json).unwrap();
    assert_eq!(xf, back);
}
