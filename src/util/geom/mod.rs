mod poly2d;
mod point2d;
mod quad;
mod rect;

pub use poly2d::{Poly2D, PointLocation};
pub use point2d::Point2D;
pub use quad::Quadrilateral;
pub use rect::Rect;
