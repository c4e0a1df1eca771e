use std::sync::Arc;

use image::RgbImage;
use tracing::debug;

use crate::{detector::RawMarker, util::{geom::{Point2D, Rect}, math::Vec2}};

use super::{edges::TrackedEdge, pattern::TrackedPattern, IdentityConfig};

/// Where the motion recoverer last saw a marker
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionAnchor {
	/// Center of the motion region
	pub position: Point2D,
	/// Region orientation in degrees
	pub angle: f64,
}

/// A fiducial currently (or recently) in view
#[derive(Clone, Debug)]
pub struct TrackedMarker {
	pub id: u32,
	/// Center, in pixels
	pub position: Point2D,
	/// Heading, in radians
	pub angle: f64,
	/// Side length, in pixels
	pub size: f64,
	/// Bounds of [polygon](Self::polygon)
	pub bounding_rect: Rect,
	/// Motion-recovery reference, separate from the detected pose
	pub anchor: Option<MotionAnchor>,
	/// Simplified outline of the blob holding this marker
	pub polygon: Vec<Point2D>,
	/// Vertex index triples covering [polygon](Self::polygon)
	pub triangulation: Vec<usize>,
	pub edges: Vec<TrackedEdge>,
	/// Relationships between activated edges, rebuilt every pass
	pub patterns: Vec<TrackedPattern>,
	/// Passes this marker was detected on
	pub frame_count: u32,
	/// Consecutive passes this marker was missed
	pub lost_count: u32,
	/// Detected during the current pass
	pub checked: bool,
	/// Frame cropped to [bounding_rect](Self::bounding_rect)
	pub thumbnail: Option<Arc<RgbImage>>,
}

impl TrackedMarker {
	pub fn new(raw: &RawMarker) -> Self {
		Self {
			id: raw.id,
			position: raw.center(),
			angle: raw.angle(),
			size: raw.size(),
			bounding_rect: Rect::default(),
			anchor: None,
			polygon: Vec::new(),
			triangulation: Vec::new(),
			edges: Vec::new(),
			patterns: Vec::new(),
			frame_count: 0,
			lost_count: 0,
			checked: true,
			thumbnail: None,
		}
	}

	/// Overwrite the pose with a fresh detection
	pub fn update(&mut self, raw: &RawMarker) {
		self.position = raw.center();
		self.angle = raw.angle();
		self.size = raw.size();
	}

	/// Edges currently shown to consumers
	pub fn activated_edges(&self) -> impl Iterator<Item = &TrackedEdge> + '_ {
		self.edges.iter().filter(|edge| edge.activated)
	}

	/// Move by `offset` and turn by `da` radians.
	///
	/// The polygon and edges are rotated by `-da` about the old center and
	/// carried along with it.
	pub fn apply_rigid_motion(&mut self, offset: Vec2, da: f64) {
		let old_center = self.position;
		let new_center = old_center + offset;
		let carry = |p: Point2D| new_center + (p - old_center).rotate(-da);

		self.position = new_center;
		self.angle += da;
		for vertex in self.polygon.iter_mut() {
			*vertex = carry(*vertex);
		}
		for edge in self.edges.iter_mut() {
			edge.position = carry(edge.position);
			edge.direction = edge.direction.rotate(-da);
		}
		if let Some(rect) = Rect::bounding(&self.polygon) {
			self.bounding_rect = rect;
		}
		self.lost_count = 0;
	}
}

/// Merge one frame's detections into the live set.
///
/// Markers are matched by id. A marker that has already been matched this
/// pass ignores further detections with its id. Unmatched markers count a
/// miss and are dropped after [IdentityConfig::evict_threshold] misses.
pub fn merge_detections(markers: &mut Vec<TrackedMarker>, detections: &[RawMarker], config: &IdentityConfig) {
	for marker in markers.iter_mut() {
		marker.checked = false;
	}

	for raw in detections {
		match markers.iter_mut().find(|marker| marker.id == raw.id) {
			Some(marker) if marker.checked => {
				debug!(marker = raw.id, "ignoring duplicate detection");
			},
			Some(marker) => {
				marker.update(raw);
				marker.checked = true;
			},
			None => {
				debug!(marker = raw.id, x = raw.center().x(), y = raw.center().y(), "new marker");
				markers.push(TrackedMarker::new(raw));
			},
		}
	}

	markers.retain_mut(|marker| {
		if marker.checked {
			marker.lost_count = 0;
			marker.frame_count += 1;
			return true;
		}
		marker.lost_count += 1;
		if marker.lost_count >= config.evict_threshold {
			debug!(marker = marker.id, frames = marker.frame_count, "marker lost");
			return false;
		}
		true
	});
}

#[cfg(test)]
mod test {
	use super::*;

	fn raw(id: u32, x: f64, y: f64) -> RawMarker {
		RawMarker::new(id, [[x - 10., y + 10.], [x + 10., y + 10.], [x + 10., y - 10.], [x - 10., y - 10.]])
	}

	#[test]
	fn merge_keeps_identity() {
		let config = IdentityConfig::default();
		let mut markers = Vec::new();
		for i in 0..10 {
			merge_detections(&mut markers, &[raw(4, 100. + i as f64, 50.)], &config);
			assert_eq!(markers.len(), 1);
			assert_eq!(markers[0].frame_count, i + 1);
			assert_eq!(markers[0].position, Point2D::of(100. + i as f64, 50.));
		}
	}

	#[test]
	fn duplicates_first_wins() {
		let config = IdentityConfig::default();
		let mut markers = Vec::new();
		merge_detections(&mut markers, &[raw(1, 10., 10.), raw(1, 90., 90.)], &config);
		assert_eq!(markers.len(), 1);
		assert_eq!(markers[0].position, Point2D::of(10., 10.));

		merge_detections(&mut markers, &[raw(1, 20., 20.), raw(1, 80., 80.)], &config);
		assert_eq!(markers.len(), 1);
		assert_eq!(markers[0].position, Point2D::of(20., 20.));
	}

	#[test]
	fn eviction_threshold() {
		let config = IdentityConfig { evict_threshold: 4 };
		let mut markers = Vec::new();
		merge_detections(&mut markers, &[raw(2, 0., 0.)], &config);
		for _ in 0..3 {
			merge_detections(&mut markers, &[], &config);
		}
		assert_eq!(markers.len(), 1);
		assert_eq!(markers[0].lost_count, 3);
		merge_detections(&mut markers, &[], &config);
		assert!(markers.is_empty());
	}

	#[test]
	fn rigid_motion_carries_shape() {
		let mut marker = TrackedMarker::new(&raw(3, 100., 100.));
		marker.polygon = vec![Point2D::of(110., 100.), Point2D::of(100., 120.), Point2D::of(90., 100.)];
		marker.lost_count = 5;

		let da = std::f64::consts::FRAC_PI_2;
		marker.apply_rigid_motion(Vec2::of(5., -5.), da);

		assert_eq!(marker.position, Point2D::of(105., 95.));
		assert_eq!(marker.lost_count, 0);
		// (10, 0) about the old center, rotated by -90deg
		let expected = Point2D::of(105., 85.);
		assert!(marker.polygon[0].distance_to(&expected) < 1e-9);
	}
}
