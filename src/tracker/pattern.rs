//! Rule-based labeling of edge pairs.
use serde::Serialize;

use crate::util::{math::Vec2, unit::to_unit};

use super::{PatternConfig, TrackedMarker};

/// Relationship between two edges, relative to their marker's axes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum PatternKind {
	/// Both point the same way along one axis, close together
	ParallelNear = 1,
	/// Both point the same way along one axis, further apart
	ParallelApart = 2,
	/// They point against each other along one axis
	Opposed = 3,
	/// One follows the forward axis, the other the right axis
	Perpendicular = 4,
}

impl PatternKind {
	/// Numeric pattern code
	pub const fn code(self) -> u8 {
		self as u8
	}
}

impl From<PatternKind> for u8 {
	fn from(value: PatternKind) -> Self {
		value.code()
	}
}

/// A labeled pair of edges on one marker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedPattern {
	/// Indices into the marker's edge list
	pub edges: [usize; 2],
	pub kind: PatternKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceBand {
	Near,
	Mid,
	Far,
}

/// Boolean features the rules are written against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PairFeatures {
	pub parallel: bool,
	pub opposite: bool,
	pub perpendicular: bool,
	pub band: Option<DistanceBand>,
}

impl PairFeatures {
	/// Extract features for edge directions `a` and `b`, `distance` apart in
	/// normalized frame units, on a marker with the given axes.
	///
	/// Returns `None` when either direction has no length.
	pub fn new(forward: Vec2, right: Vec2, a: Vec2, b: Vec2, distance: f64, config: &PatternConfig) -> Option<Self> {
		let a = a.norm()?;
		let b = b.norm()?;
		let t = config.alignment;

		let along = |axis: &Vec2| (axis.dot(&a), axis.dot(&b));
		let aligned = |(da, db): (f64, f64)| da.abs() > t && db.abs() > t;
		let same_sign = |(da, db): (f64, f64)| da.signum() == db.signum();

		let fwd = along(&forward);
		let rgt = along(&right);
		let parallel = (aligned(fwd) && same_sign(fwd)) || (aligned(rgt) && same_sign(rgt));
		let opposite = (aligned(fwd) && !same_sign(fwd)) || (aligned(rgt) && !same_sign(rgt));
		let perpendicular = (fwd.0.abs() > t && rgt.1.abs() > t) || (rgt.0.abs() > t && fwd.1.abs() > t);

		let band = [
			(&config.near, DistanceBand::Near),
			(&config.mid, DistanceBand::Mid),
			(&config.far, DistanceBand::Far),
		]
			.into_iter()
			.find(|(range, _)| range.contains(&distance))
			.map(|(_, band)| band);

		Some(Self { parallel, opposite, perpendicular, band })
	}

	fn apart(&self) -> bool {
		matches!(self.band, Some(DistanceBand::Mid | DistanceBand::Far))
	}
}

fn parallel_near(f: &PairFeatures) -> bool {
	f.parallel && f.band == Some(DistanceBand::Near)
}

fn parallel_apart(f: &PairFeatures) -> bool {
	f.parallel && f.apart()
}

fn opposed(f: &PairFeatures) -> bool {
	f.opposite && f.apart()
}

fn perpendicular(f: &PairFeatures) -> bool {
	f.perpendicular && f.apart()
}

/// Evaluated in order, first match wins
const RULES: [(fn(&PairFeatures) -> bool, PatternKind); 4] = [
	(parallel_near, PatternKind::ParallelNear),
	(parallel_apart, PatternKind::ParallelApart),
	(opposed, PatternKind::Opposed),
	(perpendicular, PatternKind::Perpendicular),
];

pub fn classify(features: &PairFeatures) -> Option<PatternKind> {
	RULES.iter()
		.find(|(matches, _)| matches(features))
		.map(|(_, kind)| *kind)
}

/// Rebuild `marker.patterns` from its activated edges.
///
/// `width` and `height` are the frame size, used to measure edge distances
/// in normalized frame units.
pub fn detect_patterns(marker: &mut TrackedMarker, width: u32, height: u32, config: &PatternConfig) {
	marker.patterns.clear();
	if marker.edges.len() < 2 {
		return;
	}

	let forward = Vec2::from_angle(marker.angle);
	let right = Vec2::from_angle(marker.angle + std::f64::consts::FRAC_PI_2);

	for (i, a) in marker.edges.iter().enumerate() {
		for (j, b) in marker.edges[..i].iter().enumerate() {
			if !a.activated || !b.activated {
				continue;
			}
			let distance = (to_unit(a.position, width, height) - to_unit(b.position, width, height)).mag();
			let Some(features) = PairFeatures::new(forward, right, a.direction, b.direction, distance, config) else {
				continue;
			};
			if let Some(kind) = classify(&features) {
				marker.patterns.push(TrackedPattern { edges: [i, j], kind });
			}
		}
	}
}
