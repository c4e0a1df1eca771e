use serde::Serialize;

use super::Point2D;

/// Axis-aligned integer rectangle (pixel grid)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest rect holding every point (pixel-inclusive, like a raster bounding box)
    pub fn bounding(points: &[Point2D]) -> Option<Rect> {
        let first = points.first()?;
        let (mut x0, mut y0) = (first.x(), first.y());
        let (mut x1, mut y1) = (x0, y0);
        for p in &points[1..] {
            x0 = x0.min(p.x());
            y0 = y0.min(p.y());
            x1 = x1.max(p.x());
            y1 = y1.max(p.y());
        }
        let (x0, y0) = (x0.floor() as i32, y0.floor() as i32);
        let (x1, y1) = (x1.floor() as i32, y1.floor() as i32);
        Some(Rect::new(x0, y0, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32))
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center(&self) -> Point2D {
        Point2D::of(
            self.x as f64 + self.width as f64 / 2.,
            self.y as f64 + self.height as f64 / 2.,
        )
    }

    /// Half-open containment: left/top edges inside, right/bottom outside
    pub fn contains(&self, p: &Point2D) -> bool {
        let (x, y) = (p.x(), p.y());
        x >= self.x as f64
            && y >= self.y as f64
            && x < self.x as f64 + self.width as f64
            && y < self.y as f64 + self.height as f64
    }

    /// Intersection with a `width`×`height` image, if any pixel remains
    pub fn clip(&self, width: u32, height: u32) -> Option<Rect> {
        let x0 = self.x.max(0) as i64;
        let y0 = self.y.max(0) as i64;
        let x1 = (self.x as i64 + self.width as i64).min(width as i64);
        let y1 = (self.y as i64 + self.height as i64).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounding_is_pixel_inclusive() {
        let pts = [Point2D::of(2., 3.), Point2D::of(5., 1.), Point2D::of(4., 7.)];
        assert_eq!(Rect::bounding(&pts), Some(Rect::new(2, 1, 4, 7)));
        assert_eq!(Rect::bounding(&[]), None);
    }

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10, 10, 5, 5);
        assert!(r.contains(&Point2D::of(10., 10.)));
        assert!(r.contains(&Point2D::of(14.9, 14.9)));
        assert!(!r.contains(&Point2D::of(15., 12.)));
        assert!(!r.contains(&Point2D::of(9.9, 12.)));
    }

    #[test]
    fn clip_to_image() {
        let r = Rect::new(-5, 90, 20, 20);
        assert_eq!(r.clip(100, 100), Some(Rect::new(0, 90, 15, 10)));
        assert_eq!(Rect::new(200, 0, 5, 5).clip(100, 100), None);
    }
}
