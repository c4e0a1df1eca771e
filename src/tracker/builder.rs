use crate::{detector::FiducialDetector, worker::TrackerWorker};

use super::{MarkerTracker, TrackerBuildError, TrackerConfig};

/// Assembles a [MarkerTracker] or a [TrackerWorker]
#[derive(Default)]
pub struct TrackerBuilder {
	/// Configuration parameters
	pub config: TrackerConfig,
	detector: Option<Box<dyn FiducialDetector>>,
}

impl TrackerBuilder {
	pub fn new(config: TrackerConfig) -> Self {
		Self {
			config,
			detector: None,
		}
	}

	/// Use `detector` to find fiducials
	pub fn set_detector(&mut self, detector: impl FiducialDetector + 'static) {
		self.detector = Some(Box::new(detector));
	}

	pub fn with_detector(mut self, detector: impl FiducialDetector + 'static) -> Self {
		self.set_detector(detector);
		self
	}

	pub fn has_detector(&self) -> bool {
		self.detector.is_some()
	}

	/// Build a synchronous tracker
	pub fn build(self) -> Result<MarkerTracker, TrackerBuildError> {
		let detector = self.detector.ok_or(TrackerBuildError::MissingDetector)?;
		MarkerTracker::new(self.config, detector)
	}

	/// Build a tracker and run it on a background thread
	pub fn spawn(self) -> Result<TrackerWorker, TrackerBuildError> {
		TrackerWorker::spawn(self.build()?)
	}
}
