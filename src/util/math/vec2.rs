use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::Serialize;

/// Two-dimensional vector in pixel (or normalized) space
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Zero vector
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0., y: 0. }
    }

    /// Create vector from values
    #[inline]
    pub const fn of(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `theta` radians
    pub fn from_angle(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self::of(cos, sin)
    }

    /// Vector magnitude
    #[inline]
    pub fn mag(&self) -> f64 {
        f64::hypot(self.x, self.y)
    }

    /// Vector dot product
    #[inline]
    pub const fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product
    #[inline]
    pub const fn cross(&self, other: &Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// This vector, normalized.
    ///
    /// Returns `None` for a zero-length (or non-finite) vector instead of
    /// producing NaN components.
    pub fn norm(&self) -> Option<Vec2> {
        let mag = self.mag();
        if mag > f64::EPSILON && mag.is_finite() {
            Some(*self / mag)
        } else {
            None
        }
    }

    /// Rotate counter-clockwise (in a y-down image, clockwise on screen) by `theta` radians
    pub fn rotate(&self, theta: f64) -> Vec2 {
        let (sin, cos) = theta.sin_cos();
        Vec2::of(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
        )
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Self::Output {
        Self::of(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Self::Output {
        Self::of(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(mut self, rhs: f64) -> Self::Output {
        self *= rhs;
        self
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Self::Output {
        Self::of(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Self::Output {
        Self::of(-self.x, -self.y)
    }
}
