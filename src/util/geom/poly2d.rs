use std::ops::Index;

use super::Point2D;

/// Tolerance for treating a point as lying on a polygon edge
const BOUNDARY_EPS: f64 = 1e-9;

/// Where a point sits relative to a closed polygon
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Boundary,
    Outside,
}

/// Borrowed view of an implicitly closed vertex loop
#[derive(Clone, Copy, Debug)]
pub struct Poly2D<'a>(pub &'a [Point2D]);

impl<'a> Index<usize> for Poly2D<'a> {
    type Output = Point2D;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<'a> Poly2D<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Vertex `i`, wrapping around the loop
    #[inline]
    pub fn vertex(&self, i: usize) -> Point2D {
        self.0[i % self.len()]
    }

    /// Shoelace area. Positive when the loop turns clockwise on screen
    /// (counter-clockwise in y-up coordinates).
    pub fn signed_area(&self) -> f64 {
        let sz = self.len();
        if sz < 3 {
            return 0.;
        }
        let mut acc = 0.;
        for i in 0..sz {
            let p0 = self.vertex(i);
            let p1 = self.vertex(i + 1);
            acc += p0.vec().cross(p1.vec());
        }
        acc / 2.
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Classify `q` by crossing parity, checking edges for boundary hits first.
    pub fn locate(&self, q: &Point2D) -> PointLocation {
        let sz = self.len();
        if sz == 0 {
            return PointLocation::Outside;
        }

        let mut inside = false;
        for i in 0..sz {
            let a = self.vertex(i);
            let b = self.vertex(i + 1);

            let edge = b - a;
            let rel = *q - a;
            if edge.cross(&rel).abs() <= BOUNDARY_EPS * (1. + edge.mag())
                && q.x() >= a.x().min(b.x()) - BOUNDARY_EPS
                && q.x() <= a.x().max(b.x()) + BOUNDARY_EPS
                && q.y() >= a.y().min(b.y()) - BOUNDARY_EPS
                && q.y() <= a.y().max(b.y()) + BOUNDARY_EPS
            {
                return PointLocation::Boundary;
            }

            if (a.y() > q.y()) != (b.y() > q.y()) {
                let x_cross = a.x() + (q.y() - a.y()) * edge.x / edge.y;
                if q.x() < x_cross {
                    inside = !inside;
                }
            }
        }

        if inside {
            PointLocation::Inside
        } else {
            PointLocation::Outside
        }
    }

    /// Strictly inside (edges excluded)
    pub fn contains_strict(&self, q: &Point2D) -> bool {
        self.locate(q) == PointLocation::Inside
    }

    /// Inside or on an edge
    pub fn contains(&self, q: &Point2D) -> bool {
        self.locate(q) != PointLocation::Outside
    }

    /// Ear-clipping triangulation.
    ///
    /// Returns a flat list of vertex index triples. Degenerate or
    /// self-intersecting loops yield whatever ears could be clipped.
    pub fn triangulate(&self) -> Vec<usize> {
        let sz = self.len();
        let orientation = self.signed_area().signum();
        if sz < 3 || orientation == 0. {
            return Vec::new();
        }

        let mut remaining: Vec<usize> = (0..sz).collect();
        let mut result = Vec::with_capacity(3 * (sz - 2));

        while remaining.len() > 3 {
            let m = remaining.len();
            let ear = (0..m).find(|&k| {
                let ia = remaining[(k + m - 1) % m];
                let ib = remaining[k];
                let ic = remaining[(k + 1) % m];
                let (a, b, c) = (self.0[ia], self.0[ib], self.0[ic]);

                // Reflex or collinear corners are never ears
                if (b - a).cross(&(c - b)) * orientation <= 0. {
                    return false;
                }

                !remaining.iter()
                    .filter(|&&j| j != ia && j != ib && j != ic)
                    .any(|&j| in_triangle(&self.0[j], &a, &b, &c, orientation))
            });

            let Some(k) = ear else {
                break;
            };
            let m = remaining.len();
            result.extend_from_slice(&[remaining[(k + m - 1) % m], remaining[k], remaining[(k + 1) % m]]);
            remaining.remove(k);
        }

        if remaining.len() == 3 {
            result.extend_from_slice(&remaining);
        }
        result
    }
}

/// Containment (edges included) in triangle `abc` wound with `orientation`
fn in_triangle(p: &Point2D, a: &Point2D, b: &Point2D, c: &Point2D, orientation: f64) -> bool {
    let d0 = (*b - *a).cross(&(*p - *a)) * orientation;
    let d1 = (*c - *b).cross(&(*p - *b)) * orientation;
    let d2 = (*a - *c).cross(&(*p - *c)) * orientation;
    d0 >= 0. && d1 >= 0. && d2 >= 0.
}
