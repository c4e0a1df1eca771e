use std::ops::Range;

use super::TrackerBuildError;

/// How the [Preprocessor](crate::Preprocessor) normalizes contrast
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContrastMode {
	/// Binarize every channel at [PreprocessConfig::contrast_threshold]
	Threshold,
	/// Gamma-correct every channel (`out = 255 * (in / 255) ^ gamma`)
	Gamma(f64),
}

impl Default for ContrastMode {
	fn default() -> Self {
		Self::Threshold
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessConfig {
	/// Binarization level for [ContrastMode::Threshold].
	///
	/// Channel values below this become black, everything else white.
	/// The default value is 100.
	pub contrast_threshold: u8,
	pub mode: ContrastMode,
	/// How many preprocessed frames are kept in the rolling cache
	pub history: usize,
	/// Replace the working image with the mean of the cached frames
	pub average_frames: bool,
}

impl Default for PreprocessConfig {
	fn default() -> Self {
		Self {
			contrast_threshold: 100,
			mode: ContrastMode::Threshold,
			history: 3,
			average_frames: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct IdentityConfig {
	/// A marker missed for this many consecutive passes is dropped
	pub evict_threshold: u32,
}

impl Default for IdentityConfig {
	fn default() -> Self {
		Self {
			evict_threshold: 30,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContourConfig {
	/// Douglas-Peucker tolerance (pixels) when reducing a contour to a polygon
	pub approx_epsilon: f64,
}

impl Default for ContourConfig {
	fn default() -> Self {
		Self {
			approx_epsilon: 5.,
		}
	}
}

/// Tip detection and edge lifecycle parameters
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeConfig {
	/// The middle segment of a tip window must be shorter than this
	/// fraction of both outer segments
	pub ratio: f64,
	/// Outer segments must have a dot product below this
	pub opposite_dot: f64,
	/// Minimum distance (pixels) between a tip and its marker's center
	pub min_center_distance: f64,
	/// Minimum length (pixels) of the middle segment
	pub min_middle_length: f64,
	/// Radius for matching a tip to an existing edge, as a fraction of
	/// frame width
	pub match_radius: f64,
	/// Detections before an edge is activated
	pub confirm_threshold: u32,
	/// Misses before an edge is deactivated
	pub deactivate_threshold: u32,
	/// Misses before an edge is forgotten
	pub evict_threshold: u32,
}

impl Default for EdgeConfig {
	fn default() -> Self {
		Self {
			ratio: 0.4,
			opposite_dot: -0.5,
			min_center_distance: 60.,
			min_middle_length: 8.,
			match_radius: 0.15,
			confirm_threshold: 5,
			deactivate_threshold: 3,
			evict_threshold: 8,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct MotionConfig {
	/// Run motion history and recovery at all
	pub enabled: bool,
	/// Regions must be strictly larger than this (square pixels)
	pub min_area: u64,
	/// History duration, in frame periods
	pub history_frames: f64,
	/// Rotations larger than this (degrees) between two passes are
	/// treated as noise and ignored
	pub max_angle_jump: f64,
	/// Valid gradient range for the history (milliseconds)
	pub gradient_delta: Range<f64>,
	/// Dilation radius (pixels) applied before differencing
	pub dilate_radius: u8,
}

impl Default for MotionConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			min_area: 3000,
			history_frames: 5.,
			max_angle_jump: 100.,
			gradient_delta: 1. .. 1e6,
			dilate_radius: 2,
		}
	}
}

/// Pattern rule thresholds
#[derive(Clone, Debug, PartialEq)]
pub struct PatternConfig {
	/// Minimum |dot| for an edge direction to count as aligned with an axis
	pub alignment: f64,
	/// Distance bands in normalized frame units
	pub near: Range<f64>,
	pub mid: Range<f64>,
	pub far: Range<f64>,
}

impl Default for PatternConfig {
	fn default() -> Self {
		Self {
			alignment: 0.7,
			near: 0.05 .. 0.15,
			mid: 0.15 .. 0.5,
			far: 0.5 .. 1.5,
		}
	}
}

/// Configuration for [MarkerTracker](crate::MarkerTracker)
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
	pub preprocess: PreprocessConfig,
	/// Fiducial detection runs on the working image upscaled by this factor.
	///
	/// The default value is 1.5.
	pub detect_scale: f32,
	/// Target pass rate of the background worker (Hz). Also sets the
	/// motion history duration.
	pub fps: f64,
	pub identity: IdentityConfig,
	pub contour: ContourConfig,
	pub edges: EdgeConfig,
	pub motion: MotionConfig,
	pub patterns: PatternConfig,
}

impl Default for TrackerConfig {
	fn default() -> Self {
		Self {
			preprocess: Default::default(),
			detect_scale: 1.5,
			fps: 30.,
			identity: Default::default(),
			contour: Default::default(),
			edges: Default::default(),
			motion: Default::default(),
			patterns: Default::default(),
		}
	}
}

impl TrackerConfig {
	/// Duration of one worker period
	pub fn period(&self) -> std::time::Duration {
		std::time::Duration::from_secs_f64(1. / self.fps)
	}

	/// Motion history duration in milliseconds
	pub(crate) fn history_duration_ms(&self) -> f64 {
		1000. / self.fps * self.motion.history_frames
	}

	/// Check for nonsensical values
	pub fn validate(&self) -> Result<(), TrackerBuildError> {
		if !(self.fps.is_finite() && self.fps > 0.) {
			return Err(TrackerBuildError::InvalidFrameRate(self.fps));
		}
		if !(self.detect_scale.is_finite() && self.detect_scale > 0.) {
			return Err(TrackerBuildError::InvalidDetectScale(self.detect_scale));
		}
		if let ContrastMode::Gamma(gamma) = self.preprocess.mode {
			if !(gamma.is_finite() && gamma > 0.) {
				return Err(TrackerBuildError::InvalidGamma(gamma));
			}
		}
		if self.preprocess.history == 0 {
			return Err(TrackerBuildError::EmptyFrameCache);
		}
		if self.identity.evict_threshold == 0 {
			return Err(TrackerBuildError::ZeroThreshold("identity.evict_threshold"));
		}
		let epsilon = self.contour.approx_epsilon;
		if !(epsilon.is_finite() && epsilon > 0.) {
			return Err(TrackerBuildError::InvalidContourTolerance(epsilon));
		}
		let edges = &self.edges;
		if edges.confirm_threshold == 0 {
			return Err(TrackerBuildError::ZeroThreshold("edges.confirm_threshold"));
		}
		if edges.deactivate_threshold == 0 {
			return Err(TrackerBuildError::ZeroThreshold("edges.deactivate_threshold"));
		}
		if edges.deactivate_threshold >= edges.evict_threshold {
			return Err(TrackerBuildError::EdgeThresholds {
				deactivate: edges.deactivate_threshold,
				evict: edges.evict_threshold,
			});
		}
		if !(edges.ratio > 0. && edges.match_radius > 0.) {
			return Err(TrackerBuildError::InvalidEdgeGeometry);
		}
		if !(self.motion.history_frames > 0.) {
			return Err(TrackerBuildError::InvalidMotionHistory(self.motion.history_frames));
		}
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let config = TrackerConfig::default();
		config.validate().unwrap();
		assert_eq!(config.history_duration_ms(), 1000. / 30. * 5.);
	}

	#[test]
	fn rejects_bad_edge_thresholds() {
		let mut config = TrackerConfig::default();
		config.edges.deactivate_threshold = 8;
		assert!(matches!(config.validate(), Err(TrackerBuildError::EdgeThresholds { deactivate: 8, evict: 8 })));
	}

	#[test]
	fn rejects_zero_fps() {
		let config = TrackerConfig { fps: 0., ..Default::default() };
		assert!(matches!(config.validate(), Err(TrackerBuildError::InvalidFrameRate(_))));
	}

	#[test]
	fn rejects_non_positive_contour_tolerance() {
		for epsilon in [0., -1., f64::NAN] {
			let mut config = TrackerConfig::default();
			config.contour.approx_epsilon = epsilon;
			assert!(matches!(config.validate(), Err(TrackerBuildError::InvalidContourTolerance(_))), "accepted {epsilon}");
		}
	}
}
