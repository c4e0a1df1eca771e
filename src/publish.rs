//! Read-only view of the tracker state handed to consumers.
//!
//! Positions are in normalized frame space (see [unit](crate::util::unit)):
//! origin at the frame center, y up, both axes in `[-1, 1]`.
use std::sync::Arc;

use image::RgbImage;
use serde::Serialize;

use crate::{
	tracker::{PatternKind, TrackedMarker},
	util::{math::Vec2, unit::{to_unit, unit_length, UnitPoint}},
};

/// All tracked markers at the end of one pass
#[derive(Clone, Debug, Default, Serialize)]
pub struct TrackerSnapshot {
	/// Size of the frame the pass ran on
	pub frame_width: u32,
	pub frame_height: u32,
	pub markers: Vec<MarkerSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MarkerSnapshot {
	pub id: u32,
	pub position: UnitPoint,
	/// Side length relative to the mean frame dimension
	pub size: f64,
	/// Heading in radians
	pub angle: f64,
	pub frame_count: u32,
	pub polygon: Vec<UnitPoint>,
	/// Activated edges only
	pub edges: Vec<EdgeSnapshot>,
	/// Triangle vertex indices into [polygon](Self::polygon)
	pub indices: Vec<usize>,
	pub patterns: Vec<PatternSnapshot>,
	/// Frame cropped to the marker's bounds
	#[serde(skip)]
	pub thumbnail: Option<Arc<RgbImage>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EdgeSnapshot {
	pub id: u64,
	pub x: f64,
	pub y: f64,
	/// Unit direction out of the tip, in pixel axes (y down)
	pub direction: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PatternSnapshot {
	/// Ids of the two edges
	pub edges: [u64; 2],
	pub pattern: PatternKind,
}

impl MarkerSnapshot {
	pub fn new(marker: &TrackedMarker, width: u32, height: u32) -> Self {
		let edges = marker.activated_edges()
			.map(|edge| {
				let p = to_unit(edge.position, width, height);
				EdgeSnapshot {
					id: edge.id,
					x: p.x,
					y: p.y,
					direction: edge.direction,
				}
			})
			.collect();

		let patterns = marker.patterns.iter()
			.filter_map(|pattern| {
				let a = marker.edges.get(pattern.edges[0])?;
				let b = marker.edges.get(pattern.edges[1])?;
				Some(PatternSnapshot {
					edges: [a.id, b.id],
					pattern: pattern.kind,
				})
			})
			.collect();

		Self {
			id: marker.id,
			position: to_unit(marker.position, width, height),
			size: unit_length(marker.size, width, height),
			angle: marker.angle,
			frame_count: marker.frame_count,
			polygon: marker.polygon.iter()
				.map(|p| to_unit(*p, width, height))
				.collect(),
			edges,
			indices: marker.triangulation.clone(),
			patterns,
			thumbnail: marker.thumbnail.clone(),
		}
	}
}

impl TrackerSnapshot {
	pub fn new(markers: &[TrackedMarker], width: u32, height: u32) -> Self {
		if width == 0 || height == 0 {
			return Self::default();
		}
		Self {
			frame_width: width,
			frame_height: height,
			markers: markers.iter()
				.map(|marker| MarkerSnapshot::new(marker, width, height))
				.collect(),
		}
	}

	pub fn marker(&self, id: u32) -> Option<&MarkerSnapshot> {
		self.markers.iter().find(|marker| marker.id == id)
	}
}

#[cfg(test)]
mod test {
	use crate::{
		detector::RawMarker,
		tracker::{TrackedEdge, TrackedPattern},
		util::geom::Point2D,
	};

	use super::*;

	#[test]
	fn normalizes_marker() {
		let raw = RawMarker::new(5, [[140., 85.], [160., 85.], [160., 65.], [140., 65.]]);
		let mut marker = TrackedMarker::new(&raw);
		marker.frame_count = 3;
		marker.polygon = vec![Point2D::of(0., 0.), Point2D::of(200., 0.), Point2D::of(200., 100.)];
		marker.triangulation = vec![0, 1, 2];
		let edge = |id, activated| TrackedEdge {
			id,
			position: Point2D::of(100., 50.),
			direction: Vec2::of(0., -1.),
			frame_count: 7,
			lost_count: 0,
			checked: true,
			activated,
		};
		marker.edges = vec![edge(11, true), edge(12, false), edge(13, true)];
		marker.patterns = vec![TrackedPattern { edges: [2, 0], kind: PatternKind::ParallelNear }];

		let snapshot = TrackerSnapshot::new(&[marker], 200, 100);
		let m = snapshot.marker(5).unwrap();
		assert_eq!(m.position, Vec2::of(0.5, -0.5));
		assert_eq!(m.size, 20. / 150.);
		assert_eq!(m.frame_count, 3);
		assert_eq!(m.polygon, vec![Vec2::of(-1., 1.), Vec2::of(1., 1.), Vec2::of(1., -1.)]);
		assert_eq!(m.edges.iter().map(|e| e.id).collect::<Vec<_>>(), vec![11, 13]);
		assert_eq!((m.edges[0].x, m.edges[0].y), (0., 0.));
		assert_eq!(m.patterns, vec![PatternSnapshot { edges: [13, 11], pattern: PatternKind::ParallelNear }]);
		assert_eq!(m.indices, vec![0, 1, 2]);
	}

	#[test]
	fn serializes_without_thumbnail() {
		let raw = RawMarker::new(1, [[0., 10.], [10., 10.], [10., 0.], [0., 0.]]);
		let mut marker = TrackedMarker::new(&raw);
		marker.thumbnail = Some(Arc::new(RgbImage::new(2, 2)));
		let snapshot = TrackerSnapshot::new(&[marker], 20, 20);
		let json = serde_json::to_value(&snapshot).unwrap();
		let m = &json["markers"][0];
		assert_eq!(m["id"], 1);
		assert!(m.get("thumbnail").is_none());
		assert_eq!(m["position"]["x"], -0.5);
	}
}
