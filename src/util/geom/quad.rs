use std::ops::{Index, MulAssign};

use serde::{Deserialize, Serialize};

use super::Point2D;

/// The four corners of a fiducial, in detector winding order
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 4]", into = "[[f64; 2]; 4]")]
pub struct Quadrilateral([Point2D; 4]);

impl Quadrilateral {
    pub fn from_array<T: Into<f64> + Copy>(arr: &[[T; 2]; 4]) -> Self {
        Self([
            Point2D::of(arr[0][0].into(), arr[0][1].into()),
            Point2D::of(arr[1][0].into(), arr[1][1].into()),
            Point2D::of(arr[2][0].into(), arr[2][1].into()),
            Point2D::of(arr[3][0].into(), arr[3][1].into()),
        ])
    }

    pub fn as_array(&self) -> [[f64; 2]; 4] {
        [
            [self.0[0].x(), self.0[0].y()],
            [self.0[1].x(), self.0[1].y()],
            [self.0[2].x(), self.0[2].y()],
            [self.0[3].x(), self.0[3].y()],
        ]
    }

    /// Mean of the four corners
    pub fn center(&self) -> Point2D {
        // Four points, never empty
        Point2D::centroid(&self.0).unwrap_or_default()
    }
}

impl From<[[f64; 2]; 4]> for Quadrilateral {
    fn from(value: [[f64; 2]; 4]) -> Self {
        Self::from_array(&value)
    }
}

impl From<Quadrilateral> for [[f64; 2]; 4] {
    fn from(value: Quadrilateral) -> Self {
        value.as_array()
    }
}

impl Index<usize> for Quadrilateral {
    type Output = Point2D;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl MulAssign<f64> for Quadrilateral {
    #[inline]
    fn mul_assign(&mut self, rhs: f64) {
        for corner in self.0.iter_mut() {
            *corner = Point2D::of(corner.x() * rhs, corner.y() * rhs);
        }
    }
}
