//! Per-frame marker tracking.
//!
//! Each pass runs the stages in order: preprocess, detect, merge identities,
//! extract shapes and edges, recover from motion, classify edge patterns.
mod builder;
mod config;
mod contour;
mod edges;
mod error;
mod marker;
mod motion;
mod pattern;

pub use builder::TrackerBuilder;
pub use config::{
	ContourConfig, ContrastMode, EdgeConfig, IdentityConfig, MotionConfig, PatternConfig,
	PreprocessConfig, TrackerConfig,
};
pub use contour::{external_blobs, Blob};
pub use edges::{correlate, detect_tips, Tip, TrackedEdge};
pub use error::TrackerBuildError;
pub use marker::{merge_detections, MotionAnchor, TrackedMarker};
pub use motion::{recover, MotionHistory, MotionRegion};
pub use pattern::{classify, detect_patterns, DistanceBand, PairFeatures, PatternKind, TrackedPattern};

use std::time::{Duration, Instant};

use image::RgbImage;
use tracing::{trace, warn};

use crate::{
	dbg::TimeProfile,
	detector::{detect_scaled, FiducialDetector},
	preprocess::Preprocessor,
	publish::TrackerSnapshot,
};

/// Tracks fiducial markers across frames
pub struct MarkerTracker {
	config: TrackerConfig,
	detector: Box<dyn FiducialDetector>,
	preprocessor: Preprocessor,
	motion: MotionHistory,
	markers: Vec<TrackedMarker>,
	/// Size of the last frame processed
	frame_size: (u32, u32),
	start: Instant,
}

impl MarkerTracker {
	pub fn new(config: TrackerConfig, detector: Box<dyn FiducialDetector>) -> Result<Self, TrackerBuildError> {
		config.validate()?;
		Ok(Self {
			config,
			detector,
			preprocessor: Preprocessor::new(),
			motion: MotionHistory::new(),
			markers: Vec::new(),
			frame_size: (0, 0),
			start: Instant::now(),
		})
	}

	pub fn builder() -> TrackerBuilder {
		TrackerBuilder::default()
	}

	pub fn config(&self) -> &TrackerConfig {
		&self.config
	}

	/// Replace the configuration. Takes effect on the next pass.
	pub fn set_config(&mut self, config: TrackerConfig) -> Result<(), TrackerBuildError> {
		config.validate()?;
		if config.motion.enabled != self.config.motion.enabled {
			self.motion.reset();
		}
		self.config = config;
		Ok(())
	}

	/// Live markers, in order of first sighting
	pub fn markers(&self) -> &[TrackedMarker] {
		&self.markers
	}

	pub fn marker(&self, id: u32) -> Option<&TrackedMarker> {
		self.markers.iter().find(|marker| marker.id == id)
	}

	/// Size of the last frame processed
	pub fn frame_size(&self) -> (u32, u32) {
		self.frame_size
	}

	#[cfg(test)]
	pub(crate) fn config_mut(&mut self) -> &mut TrackerConfig {
		&mut self.config
	}

	/// Forget every marker and all frame history
	pub fn reset(&mut self) {
		self.markers.clear();
		self.preprocessor.reset();
		self.motion.reset();
		self.frame_size = (0, 0);
	}

	/// Run one pass on `frame`, stamped with the time since this tracker
	/// was created.
	pub fn track(&mut self, frame: &RgbImage) -> TimeProfile {
		let elapsed = self.start.elapsed();
		self.track_at(frame, elapsed)
	}

	/// Run one pass on `frame`, stamped `elapsed` after tracking started.
	///
	/// Empty frames are ignored. Detector failures are logged and treated as
	/// a pass without detections.
	pub fn track_at(&mut self, frame: &RgbImage, elapsed: Duration) -> TimeProfile {
		let mut tp = TimeProfile::default();
		let (width, height) = frame.dimensions();
		if width == 0 || height == 0 {
			trace!("skipping empty frame");
			return tp;
		}
		self.frame_size = (width, height);
		let config = &self.config;

		let pre = self.preprocessor.process(frame, &config.preprocess);
		tp.stamp("preprocess");

		let detections = match detect_scaled(self.detector.as_mut(), &pre.gray, config.detect_scale) {
			Ok(detections) => detections,
			Err(e) => {
				warn!(error = %e, "fiducial detection failed");
				Vec::new()
			}
		};
		tp.stamp("detect");

		merge_detections(&mut self.markers, &detections, &config.identity);
		tp.stamp("identity");

		contour::update_shapes(&mut self.markers, &pre.binary, frame, config);
		tp.stamp("contours");

		if config.motion.enabled {
			let timestamp = elapsed.as_secs_f64() * 1000.;
			let regions = self.motion.update(&pre.gray, timestamp, config.history_duration_ms(), &config.motion);
			let recovered = recover(&mut self.markers, &regions, &config.motion);
			if !recovered.is_empty() {
				trace!(?recovered, regions = regions.len(), "motion recovery");
			}
		}
		tp.stamp("motion");

		for marker in self.markers.iter_mut() {
			detect_patterns(marker, width, height, &config.patterns);
		}
		tp.stamp("patterns");

		trace!(markers = self.markers.len(), detections = detections.len(), profile = %tp, "pass complete");
		tp
	}

	/// Publishable view of the current markers
	pub fn snapshot(&self) -> TrackerSnapshot {
		TrackerSnapshot::new(&self.markers, self.frame_size.0, self.frame_size.1)
	}
}

impl std::fmt::Debug for MarkerTracker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MarkerTracker")
			.field("config", &self.config)
			.field("markers", &self.markers.len())
			.field("frame_size", &self.frame_size)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod test {
	use image::Rgb;

	use crate::detector::{DetectError, RawMarker};

	use super::*;

	#[test]
	fn detector_errors_are_absorbed() {
		let detector = |_: &image::GrayImage| -> Result<Vec<RawMarker>, DetectError> {
			Err(DetectError::Backend("offline".into()))
		};
		let mut tracker = MarkerTracker::new(TrackerConfig::default(), Box::new(detector)).unwrap();
		let frame = RgbImage::from_pixel(64, 48, Rgb([200, 200, 200]));
		let tp = tracker.track_at(&frame, Duration::from_millis(10));
		assert!(tracker.markers().is_empty());
		assert_eq!(tp.stages().count(), 6);
	}

	#[test]
	fn empty_frames_are_skipped() {
		let detector = |_: &image::GrayImage| -> Result<Vec<RawMarker>, DetectError> {
			panic!("detector should not run");
		};
		let mut tracker = MarkerTracker::new(TrackerConfig::default(), Box::new(detector)).unwrap();
		let tp = tracker.track_at(&RgbImage::new(0, 0), Duration::ZERO);
		assert_eq!(tp.stages().count(), 0);
		assert_eq!(tracker.frame_size(), (0, 0));
	}

	#[test]
	fn rejects_invalid_config() {
		let detector = |_: &image::GrayImage| -> Result<Vec<RawMarker>, DetectError> { Ok(Vec::new()) };
		let mut tracker = MarkerTracker::new(TrackerConfig::default(), Box::new(detector)).unwrap();
		let bad = TrackerConfig { fps: -1., ..Default::default() };
		assert!(tracker.set_config(bad).is_err());
		assert_eq!(tracker.config().fps, 30.);
	}
}
