use crate::types::Vec2;

/// A rotation stored as sine/cosine pair.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rot {
    pub s: f32,
    pub c: f32,
}

impl Rot {
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    pub fn from_radians(rad: f32) -> Self {
        let (s, c) = rad.sin_cos();
        Self { s, c }
    }

    pub fn from_degrees(deg: f32) -> Self {
        Self::from_radians(deg.to_radians())
    }

    pub fn angle(self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Unit x-axis of the rotated frame.
    pub fn x_axis(self) -> Vec2 {
        Vec2::new(self.c, self.s)
    }

    /// Unit y-axis of the rotated frame.
    pub fn y_axis(self) -> Vec2 {
        Vec2::new(-self.s, self.c)
    }

    #[inline]
    pub fn rotate_vec(self, v: Vec2) -> Vec2 {
        Vec2 {
            x: self.c * v.x - self.s * v.y,
            y: self.s * v.x + self.c * v.y,
        }
    }

    #[inline]
    pub fn inv_rotate_vec(self, v: Vec2) -> Vec2 {
        Vec2 {
            x: self.c * v.x + self.s * v.y,
            y: -self.s * v.x + self.c * v.y,
        }
    }

    /// Compose rotations: `self * rhs` rotates by `rhs` then `self`.
    #[inline]
    pub fn mul(self, rhs: Rot) -> Rot {
        Rot {
            s: self.s * rhs.c + self.c * rhs.s,
            c: self.c * rhs.c - self.s * rhs.s,
        }
    }

    /// `self^-1 * rhs`.
    #[inline]
    pub fn inv_mul(self, rhs: Rot) -> Rot {
        Rot {
            s: self.c * rhs.s - self.s * rhs.c,
            c: self.c * rhs.c + self.s * rhs.s,
        }
    }
}

impl Default for Rot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A rigid transform: rotation followed by translation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub p: Vec2,
    pub q: Rot,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    pub fn new(p: Vec2, q: Rot) -> Self {
        Self { p, q }
    }

    pub fn from_pos_angle<P: Into<Vec2>>(p: P, angle_radians: f32) -> Self {
        Self {
            p: p.into(),
            q: Rot::from_radians(angle_radians),
        }
    }

    pub fn position(self) -> Vec2 {
        self.p
    }

    pub fn rotation(self) -> Rot {
        self.q
    }

    #[inline]
    pub fn transform_point(self, v: Vec2) -> Vec2 {
        self.q.rotate_vec(v) + self.p
    }

    #[inline]
    pub fn inv_transform_point(self, v: Vec2) -> Vec2 {
        self.q.inv_rotate_vec(v - self.p)
    }

    /// Compose transforms: `self * rhs` applies `rhs` first.
    #[inline]
    pub fn mul(self, rhs: Transform) -> Transform {
        Transform {
            q: self.q.mul(rhs.q),
            p: self.q.rotate_vec(rhs.p) + self.p,
        }
    }

    /// `self^-1 * rhs`, the transform of `rhs` expressed in `self`'s frame.
    #[inline]
    pub fn inv_mul(self, rhs: Transform) -> Transform {
        Transform {
            q: self.q.inv_mul(rhs.q),
            p: self.q.inv_rotate_vec(rhs.p - self.p),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Column-major 2x2 matrix.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Mat22 {
    pub ex: Vec2,
    pub ey: Vec2,
}

impl Mat22 {
    pub fn new(ex: Vec2, ey: Vec2) -> Self {
        Self { ex, ey }
    }

    #[inline]
    pub fn mul_vec(self, v: Vec2) -> Vec2 {
        Vec2 {
            x: self.ex.x * v.x + self.ey.x * v.y,
            y: self.ex.y * v.x + self.ey.y * v.y,
        }
    }

    pub fn inverse(self) -> Mat22 {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ex.y;
        let d = self.ey.y;
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Mat22 {
            ex: Vec2::new(det * d, -det * c),
            ey: Vec2::new(-det * b, det * a),
        }
    }

    /// Solve `A * x = b`. Cheaper than computing the inverse when solving once.
    pub fn solve(self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2 {
            x: det * (a22 * b.x - a12 * b.y),
            y: det * (a11 * b.y - a21 * b.x),
        }
    }
}

/// Column-major 3x3 matrix, used by 3-DOF joint blocks.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Mat33 {
    pub ex: Vec3,
    pub ey: Vec3,
    pub ez: Vec3,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Mat33 {
    /// Solve the full 3x3 system `A * x = b`.
    pub fn solve33(&self, b: Vec3) -> Vec3 {
        let cross_yz = self.ey.cross(self.ez);
        let mut det = self.ex.dot(cross_yz);
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec3 {
            x: det * b.dot(cross_yz),
            y: det * self.ex.dot(b.cross(self.ez)),
            z: det * self.ex.dot(self.ey.cross(b)),
        }
    }

    /// Solve the upper-left 2x2 block of the system.
    pub fn solve22(&self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2 {
            x: det * (a22 * b.x - a12 * b.y),
            y: det * (a11 * b.y - a21 * b.x),
        }
    }

    /// Inverse of the upper-left 2x2 block, zero elsewhere.
    pub fn get_inverse22(&self) -> Mat33 {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ex.y;
        let d = self.ey.y;
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Mat33 {
            ex: Vec3::new(det * d, -det * c, 0.0),
            ey: Vec3::new(-det * b, det * a, 0.0),
            ez: Vec3::ZERO,
        }
    }

    /// Symmetric inverse as a 3x3; singular blocks collapse to zero.
    pub fn get_sym_inverse33(&self) -> Mat33 {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a13 = self.ez.x;
        let a22 = self.ey.y;
        let a23 = self.ez.y;
        let a33 = self.ez.z;
        Mat33 {
            ex: Vec3::new(
                det * (a22 * a33 - a23 * a23),
                det * (a13 * a23 - a12 * a33),
                det * (a12 * a23 - a13 * a22),
            ),
            ey: Vec3::new(
                det * (a13 * a23 - a12 * a33),
                det * (a11 * a33 - a13 * a13),
                det * (a13 * a12 - a11 * a23),
            ),
            ez: Vec3::new(
                det * (a12 * a23 - a13 * a22),
                det * (a13 * a12 - a11 * a23),
                det * (a11 * a22 - a12 * a12),
            ),
        }
    }

    pub fn mul_vec3(&self, v: Vec3) -> Vec3 {
        self.ex * v.x + self.ey * v.y + self.ez * v.z
    }

    pub fn mul_vec2(&self, v: Vec2) -> Vec2 {
        Vec2 {
            x: self.ex.x * v.x + self.ey.x * v.y,
            y: self.ex.y * v.x + self.ey.y * v.y,
        }
    }
}

/// Motion of a body's center of mass over a step, for continuous collision.
///
/// `c0`/`a0` hold the state at time `alpha0` (a fraction of the current step);
/// `c`/`a` hold the end-of-step state. The stored center is the world center
/// of mass, so recovering a body transform shifts back by `local_center`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Sweep {
    pub local_center: Vec2,
    pub c0: Vec2,
    pub c: Vec2,
    pub a0: f32,
    pub a: f32,
    pub alpha0: f32,
}

impl Sweep {
    /// Interpolated transform at `beta` in [0,1] between the sweep endpoints.
    pub fn transform(&self, beta: f32) -> Transform {
        let p = self.c0 * (1.0 - beta) + self.c * beta;
        let angle = (1.0 - beta) * self.a0 + beta * self.a;
        let q = Rot::from_radians(angle);
        Transform {
            p: p - q.rotate_vec(self.local_center),
            q,
        }
    }

    /// Advance the baseline to `alpha`, which must be ahead of `alpha0`.
    pub fn advance(&mut self, alpha: f32) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.c0 += (self.c - self.c0) * beta;
        self.a0 += beta * (self.a - self.a0);
        self.alpha0 = alpha;
    }

    /// Wrap the angles into [-2pi, 2pi] to keep trig stable on long runs.
    pub fn normalize(&mut self) {
        let two_pi = 2.0 * std::f32::consts::PI;
        let d = two_pi * (self.a0 / two_pi).floor();
        self.a0 -= d;
        self.a -= d;
    }
}
