use rigid2d::collision::{time_of_impact, DistanceProxy, ToiInput, ToiState};
use rigid2d::shapes;
use rigid2d::{Shape, Sweep, Vec2};

fn proxy(shape: Shape) -> DistanceProxy {
    DistanceProxy::new(&shape, 0)
}

fn stationary(c: Vec2, a: f32) -> Sweep {
    Sweep {
        local_center: Vec2::ZERO,
        c0: c,
        c,
        a0: a,
        a,
        alpha0: 0.0,
    }
}

#[test]
fn rectangles_known_sweep() {
    let proxy_a = proxy(shapes::box_polygon(25.0, 5.0).into());
    let proxy_b = proxy(shapes::box_polygon(2.5, 2.5).into());

    let sweep_a = stationary(Vec2::new(24.0, -60.0), 2.95);
    let sweep_b = Sweep {
        local_center: Vec2::ZERO,
        c0: Vec2::new(53.474_274, -50.252_514),
        c: Vec2::new(54.595_478, -51.083_473),
        a0: 513.366_76,
        a: 513.628_11,
        alpha0: 0.0,
    };

    let output = time_of_impact(&ToiInput {
        proxy_a: &proxy_a,
        proxy_b: &proxy_b,
        sweep_a,
        sweep_b,
        t_max: 1.0,
    });

    assert!(output.state == ToiState::Touching || output.state == ToiState::Separated);
    assert!((0.0..=1.0).contains(&output.t));
    assert!(output.iterations < 20);
}

#[test]
fn overlapped_at_start() {
    let proxy_a = proxy(shapes::box_polygon(1.0, 1.0).into());
    let proxy_b = proxy(shapes::box_polygon(1.0, 1.0).into());

    let output = time_of_impact(&ToiInput {
        proxy_a: &proxy_a,
        proxy_b: &proxy_b,
        sweep_a: stationary(Vec2::ZERO, 0.0),
        sweep_b: stationary(Vec2::new(0.5, 0.0), 0.0),
        t_max: 1.0,
    });
    assert_eq!(output.state, ToiState::Overlapped);
    assert_eq!(output.t, 0.0);
}

#[test]
fn separated_when_never_touching() {
    let proxy_a = proxy(shapes::box_polygon(1.0, 1.0).into());
    let proxy_b = proxy(shapes::box_polygon(1.0, 1.0).into());

    // B drifts parallel to A, far away.
    let sweep_b = Sweep {
        local_center: Vec2::ZERO,
        c0: Vec2::new(10.0, 10.0),
        c: Vec2::new(12.0, 10.0),
        a0: 0.0,
        a: 0.0,
        alpha0: 0.0,
    };

    let output = time_of_impact(&ToiInput {
        proxy_a: &proxy_a,
        proxy_b: &proxy_b,
        sweep_a: stationary(Vec2::ZERO, 0.0),
        sweep_b,
        t_max: 1.0,
    });
    assert_eq!(output.state, ToiState::Separated);
    assert_eq!(output.t, 1.0);
}

#[test]
fn head_on_circles_touch_mid_sweep() {
    let proxy_a = proxy(shapes::circle([0.0, 0.0], 1.0).into());
    let proxy_b = proxy(shapes::circle([0.0, 0.0], 1.0).into());

    // Centers sweep from 10 apart into full overlap; the surfaces meet when
    // the center distance reaches the radii sum, about 4/5 into the sweep.
    let sweep_a = Sweep {
        local_center: Vec2::ZERO,
        c0: Vec2::new(-5.0, 0.0),
        c: Vec2::new(0.0, 0.0),
        a0: 0.0,
        a: 0.0,
        alpha0: 0.0,
    };
    let sweep_b = Sweep {
        local_center: Vec2::ZERO,
        c0: Vec2::new(5.0, 0.0),
        c: Vec2::new(0.0, 0.0),
        a0: 0.0,
        a: 0.0,
        alpha0: 0.0,
    };

    let output = time_of_impact(&ToiInput {
        proxy_a: &proxy_a,
        proxy_b: &proxy_b,
        sweep_a,
        sweep_b,
        t_max: 1.0,
    });
    assert_eq!(output.state, ToiState::Touching);
    assert!(output.t > 0.75 && output.t < 0.85);
}
