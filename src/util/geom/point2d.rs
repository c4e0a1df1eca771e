use std::{ops::{Add, Sub}, fmt::Debug};

use serde::Serialize;

use crate::util::math::Vec2;

/// A location in image pixel coordinates
#[derive(Copy, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Point2D(Vec2);

impl Debug for Point2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Point2D")
            .field(&self.0.x)
            .field(&self.0.y)
            .finish()
    }
}

impl Add<Vec2> for Point2D {
    type Output = Point2D;

    fn add(self, rhs: Vec2) -> Self::Output {
        Point2D(self.0 + rhs)
    }
}

impl Sub<Point2D> for Point2D {
    type Output = Vec2;

    fn sub(self, rhs: Point2D) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Sub<Vec2> for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Vec2) -> Self::Output {
        Point2D(self.0 - rhs)
    }
}

impl Point2D {
    #[inline(always)]
    pub const fn zero() -> Self {
        Self(Vec2::zero())
    }

    #[inline]
    pub const fn of(x: f64, y: f64) -> Self {
        Self(Vec2::of(x, y))
    }

    #[inline(always)]
    pub const fn x(&self) -> f64 {
        self.0.x
    }

    #[inline(always)]
    pub const fn y(&self) -> f64 {
        self.0.y
    }

    #[inline(always)]
    pub const fn vec(&self) -> &Vec2 {
        &self.0
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (*self - *other).mag()
    }

    pub fn midpoint(&self, other: &Point2D) -> Point2D {
        Point2D::of((self.x() + other.x()) / 2., (self.y() + other.y()) / 2.)
    }

    /// Mean of a non-empty set of points
    pub fn centroid(points: &[Point2D]) -> Option<Point2D> {
        if points.is_empty() {
            return None;
        }
        let sum = points.iter()
            .fold(Vec2::zero(), |acc, p| acc + p.0);
        Some(Point2D(sum / points.len() as f64))
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(value: Point2D) -> Self {
        [value.x(), value.y()]
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(value: [f64; 2]) -> Self {
        Self::of(value[0], value[1])
    }
}

impl From<imageproc::point::Point<i32>> for Point2D {
    fn from(value: imageproc::point::Point<i32>) -> Self {
        Self::of(value.x as f64, value.y as f64)
    }
}
