//! Engine tuning constants.
//!
//! These values are in MKS units (meters, kilograms, seconds) and are sized
//! for objects roughly between 0.1 and 10 meters. Changing them moves the
//! trade-off between stability and stiffness across the whole solver, so
//! treat them as a set.

/// Collision/constraint tolerance in meters. Chosen to be significant enough
/// to absorb float noise without visible overlap.
pub const LINEAR_SLOP: f32 = 0.005;

/// Angular counterpart of [`LINEAR_SLOP`].
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * std::f32::consts::PI;

/// Skin thickness of polygons. Keeps polygon cores separated by a stable gap
/// without the gap being visible.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Broad-phase proxy fattening in meters.
pub const AABB_EXTENSION: f32 = 0.1;

/// Broad-phase displacement lookahead. The fat AABB is extended along the
/// predicted motion by this multiple of displacement.
pub const AABB_MULTIPLIER: f32 = 4.0;

/// Maximum vertices of a convex polygon shape.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Maximum contact points in a manifold.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// GJK iteration cap.
pub const MAX_DISTANCE_ITERATIONS: usize = 20;

/// Sub-steps allowed per body per step when resolving time of impact.
pub const MAX_SUB_STEPS: usize = 8;

/// Contact cap of a TOI sub-island.
pub const MAX_TOI_CONTACTS: usize = 32;

/// Relative velocity below which restitution is suppressed.
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Fraction of penetration corrected per position iteration.
pub const BAUMGARTE: f32 = 0.2;

/// Stronger correction factor used by the TOI position solver.
pub const TOI_BAUMGARTE: f32 = 0.75;

/// Maximum position correction applied in one iteration, in meters.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Maximum angular correction applied in one iteration.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * std::f32::consts::PI;

/// Maximum translation of a body per step, in meters.
pub const MAX_TRANSLATION: f32 = 2.0;
pub const MAX_TRANSLATION_SQUARED: f32 = MAX_TRANSLATION * MAX_TRANSLATION;

/// Maximum rotation of a body per step.
pub const MAX_ROTATION: f32 = 0.5 * std::f32::consts::PI;
pub const MAX_ROTATION_SQUARED: f32 = MAX_ROTATION * MAX_ROTATION;

/// Linear speed below which a body may fall asleep, in m/s.
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.01;

/// Angular speed below which a body may fall asleep.
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * std::f32::consts::PI;

/// Seconds a body must stay below the sleep tolerances before sleeping.
pub const TIME_TO_SLEEP: f32 = 0.5;

/// Convert a (frequency, damping ratio) spring description into the
/// stiffness/damping pair consumed by soft joints: `omega = 2*pi*f`,
/// `k = m*omega^2`, `d = 2*m*zeta*omega`, with `m` the effective mass of the
/// two bodies.
pub fn linear_stiffness(
    frequency_hertz: f32,
    damping_ratio: f32,
    mass_a: f32,
    mass_b: f32,
) -> (f32, f32) {
    let mass = effective_mass(mass_a, mass_b);
    let omega = 2.0 * std::f32::consts::PI * frequency_hertz;
    (mass * omega * omega, 2.0 * mass * damping_ratio * omega)
}

/// Angular analog of [`linear_stiffness`], taking rotational inertias.
pub fn angular_stiffness(
    frequency_hertz: f32,
    damping_ratio: f32,
    inertia_a: f32,
    inertia_b: f32,
) -> (f32, f32) {
    let inertia = effective_mass(inertia_a, inertia_b);
    let omega = 2.0 * std::f32::consts::PI * frequency_hertz;
    (
        inertia * omega * omega,
        2.0 * inertia * damping_ratio * omega,
    )
}

fn effective_mass(mass_a: f32, mass_b: f32) -> f32 {
    if mass_a > 0.0 && mass_b > 0.0 {
        mass_a * mass_b / (mass_a + mass_b)
    } else if mass_a > 0.0 {
        mass_a
    } else {
        mass_b
    }
}
