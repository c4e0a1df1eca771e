//! Tip detection on marker polygons, and the edge lifecycle built on top.
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::util::{geom::{Point2D, Poly2D}, math::Vec2};

use super::EdgeConfig;

/// Next edge id. Ids are never reused while the process lives.
static NEXT_EDGE_ID: AtomicU64 = AtomicU64::new(0);

fn next_edge_id() -> u64 {
	NEXT_EDGE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A tip found on one frame's polygon, before correlation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tip {
	pub position: Point2D,
	/// Unit vector pointing out of the tip
	pub direction: Vec2,
}

/// A tip tracked across frames
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedEdge {
	/// Process-wide unique id
	pub id: u64,
	pub position: Point2D,
	/// Unit vector pointing out of the tip
	pub direction: Vec2,
	/// Passes this edge was matched on
	pub frame_count: u32,
	/// Consecutive passes this edge was missed
	pub lost_count: u32,
	/// Matched during the current pass
	pub checked: bool,
	/// Seen often enough to be published
	pub activated: bool,
}

impl TrackedEdge {
	fn new(tip: &Tip, config: &EdgeConfig) -> Self {
		Self {
			id: next_edge_id(),
			position: tip.position,
			direction: tip.direction,
			frame_count: 1,
			lost_count: 0,
			checked: true,
			activated: config.confirm_threshold <= 1,
		}
	}
}

/// Find tips on `polygon`.
///
/// Every window of four consecutive vertices `v0..v3` is a candidate. It is
/// a tip when the middle segment is short next to both outer segments, the
/// outer segments point against each other, the window's centroid is on or
/// inside the polygon, and the tip is far enough from `center`.
pub fn detect_tips(polygon: &[Point2D], center: Point2D, config: &EdgeConfig) -> Vec<Tip> {
	let poly = Poly2D(polygon);
	let n = poly.len();
	if n < 4 {
		return Vec::new();
	}

	let mut tips = Vec::new();
	for i in 0..n {
		let v0 = poly.vertex(i);
		let v1 = poly.vertex(i + 1);
		let v2 = poly.vertex(i + 2);
		let v3 = poly.vertex(i + 3);

		let s1 = v1 - v0;
		let s2 = v2 - v1;
		let s3 = v3 - v2;
		let (l1, l2, l3) = (s1.mag(), s2.mag(), s3.mag());

		// Written as products so zero-length segments just fail
		let middle_short = l2 < config.ratio * l1 && l2 < config.ratio * l3;
		if !middle_short || l2 <= config.min_middle_length {
			continue;
		}
		if s1.dot(&s3) >= config.opposite_dot {
			continue;
		}

		let tip = v1.midpoint(&v2);
		if tip.distance_to(&center) <= config.min_center_distance {
			continue;
		}

		let Some(window_center) = Point2D::centroid(&[v0, v1, v2, v3]) else {
			continue;
		};
		if !poly.contains(&window_center) {
			continue;
		}

		let Some(direction) = ((*v1.vec() + *v2.vec()) - (*v0.vec() + *v3.vec())).norm() else {
			continue;
		};

		tips.push(Tip { position: tip, direction });
	}
	tips
}

/// Match this pass's `tips` against `edges` and age the edges.
///
/// A tip updates the first unmatched edge closer than `radius` pixels;
/// leftover tips become new edges. Edges that were not matched count a
/// miss, are deactivated after [EdgeConfig::deactivate_threshold] misses,
/// and forgotten after [EdgeConfig::evict_threshold].
pub fn correlate(marker_id: u32, edges: &mut Vec<TrackedEdge>, tips: &[Tip], radius: f64, config: &EdgeConfig) {
	for edge in edges.iter_mut() {
		edge.checked = false;
	}

	let mut fresh = Vec::new();
	for tip in tips {
		let existing = edges.iter_mut()
			.find(|edge| !edge.checked && edge.position.distance_to(&tip.position) < radius);
		match existing {
			Some(edge) => {
				edge.position = tip.position;
				edge.direction = tip.direction;
				edge.checked = true;
			},
			None => fresh.push(TrackedEdge::new(tip, config)),
		}
	}

	edges.retain_mut(|edge| {
		if edge.checked {
			edge.lost_count = 0;
			edge.frame_count += 1;
			if !edge.activated && edge.frame_count >= config.confirm_threshold {
				debug!(marker = marker_id, edge = edge.id, "edge activated");
				edge.activated = true;
			}
			return true;
		}

		edge.lost_count += 1;
		if edge.activated && edge.lost_count >= config.deactivate_threshold {
			debug!(marker = marker_id, edge = edge.id, "edge deactivated");
			edge.activated = false;
		}
		if edge.lost_count >= config.evict_threshold {
			debug!(marker = marker_id, edge = edge.id, "edge evicted");
			return false;
		}
		true
	});

	edges.extend(fresh);
}
