//! Mapping between pixel coordinates and the normalized frame space that
//! snapshots are published in: origin at the frame center, `x` to the right,
//! `y` up, both in `[-1, 1]`.
use super::{geom::Point2D, math::Vec2};

/// A point (or vector) in normalized frame space
pub type UnitPoint = Vec2;

/// Pixel position to normalized frame space
#[inline]
pub fn to_unit(p: Point2D, width: u32, height: u32) -> UnitPoint {
    Vec2::of(
        2. * p.x() / width as f64 - 1.,
        1. - 2. * p.y() / height as f64,
    )
}

/// Normalized frame space back to pixel position
#[inline]
pub fn from_unit(u: UnitPoint, width: u32, height: u32) -> Point2D {
    Point2D::of(
        (u.x + 1.) * width as f64 / 2.,
        (1. - u.y) * height as f64 / 2.,
    )
}

/// Scale a pixel length by the mean frame dimension
#[inline]
pub fn unit_length(len: f64, width: u32, height: u32) -> f64 {
    len / ((width as f64 + height as f64) / 2.)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn corners_and_center() {
        assert_eq!(to_unit(Point2D::of(0., 0.), 640, 480), Vec2::of(-1., 1.));
        assert_eq!(to_unit(Point2D::of(640., 480.), 640, 480), Vec2::of(1., -1.));
        assert_eq!(to_unit(Point2D::of(320., 240.), 640, 480), Vec2::of(0., 0.));
    }

    #[test]
    fn round_trip() {
        let p = Point2D::of(123.25, 407.5);
        let back = from_unit(to_unit(p, 640, 480), 640, 480);
        assert!(back.distance_to(&p) < 1e-9);
        assert_eq!(unit_length(56., 64, 48), 1.);
    }
}
