//! Blob outlines around markers.
use std::{cmp::Ordering, sync::Arc};

use image::{imageops, GrayImage, RgbImage};
use imageproc::{
	contours::{find_contours, BorderType},
	geometry::approximate_polygon_dp,
	point::Point,
};
use tracing::trace;

use crate::util::geom::{Point2D, Poly2D, Rect};

use super::{edges, TrackedMarker, TrackerConfig};

/// Outer border of one foreground blob
#[derive(Clone, Debug)]
pub struct Blob {
	points: Vec<Point<i32>>,
	outline: Vec<Point2D>,
	area: f64,
}

impl Blob {
	fn new(points: Vec<Point<i32>>) -> Self {
		let outline: Vec<Point2D> = points.iter()
			.copied()
			.map(Point2D::from)
			.collect();
		let area = Poly2D(&outline).area();
		Self { points, outline, area }
	}

	pub fn area(&self) -> f64 {
		self.area
	}

	/// Is `p` strictly inside the outline? Points on the border are not.
	pub fn surrounds(&self, p: &Point2D) -> bool {
		Poly2D(&self.outline).contains_strict(p)
	}

	/// Douglas-Peucker reduction of the outline, in reversed vertex order
	pub fn simplify(&self, epsilon: f64) -> Vec<Point2D> {
		let mut polygon: Vec<Point2D> = approximate_polygon_dp(&self.points, epsilon, true)
			.into_iter()
			.map(Point2D::from)
			.collect();
		polygon.reverse();
		polygon
	}
}

/// Outer borders of top-level blobs in `binary`, largest first
pub fn external_blobs(binary: &GrayImage) -> Vec<Blob> {
	let mut blobs: Vec<Blob> = find_contours::<i32>(binary)
		.into_iter()
		.filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
		.filter(|contour| !contour.points.is_empty())
		.map(|contour| Blob::new(contour.points))
		.collect();
	blobs.sort_by(|a, b| b.area.partial_cmp(&a.area).unwrap_or(Ordering::Equal));
	blobs
}

/// Copy of `frame` inside `rect`, clipped to the frame
pub fn crop(frame: &RgbImage, rect: Rect) -> Option<RgbImage> {
	let clipped = rect.clip(frame.width(), frame.height())?;
	Some(imageops::crop_imm(frame, clipped.x as u32, clipped.y as u32, clipped.width, clipped.height).to_image())
}

/// Refresh polygon, triangulation, edges, bounds and thumbnail of every
/// marker whose center lies inside a blob.
///
/// Markers without a blob keep last pass's shape.
pub fn update_shapes(markers: &mut [TrackedMarker], binary: &GrayImage, frame: &RgbImage, config: &TrackerConfig) {
	if markers.is_empty() {
		return;
	}
	let blobs = external_blobs(binary);
	let radius = binary.width() as f64 * config.edges.match_radius;

	for marker in markers.iter_mut() {
		let Some(blob) = blobs.iter().find(|blob| blob.surrounds(&marker.position)) else {
			trace!(marker = marker.id, "no contour around marker");
			continue;
		};

		let polygon = blob.simplify(config.contour.approx_epsilon);
		marker.triangulation = Poly2D(&polygon).triangulate();

		let tips = edges::detect_tips(&polygon, marker.position, &config.edges);
		edges::correlate(marker.id, &mut marker.edges, &tips, radius, &config.edges);

		if let Some(rect) = Rect::bounding(&polygon) {
			marker.bounding_rect = rect;
			marker.thumbnail = crop(frame, rect).map(Arc::new);
		}
		marker.polygon = polygon;
	}
}
