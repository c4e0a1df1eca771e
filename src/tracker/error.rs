use thiserror::Error;

/// Error generated when building a [MarkerTracker](crate::MarkerTracker)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerBuildError {
	#[error("Frame rate must be positive (got {0})")]
	InvalidFrameRate(f64),
	#[error("Detection scale must be positive (got {0})")]
	InvalidDetectScale(f32),
	#[error("Gamma must be positive (got {0})")]
	InvalidGamma(f64),
	#[error("Preprocessor frame cache must hold at least one frame")]
	EmptyFrameCache,
	#[error("{0} must be at least 1")]
	ZeroThreshold(&'static str),
	#[error("Edge deactivation threshold ({deactivate}) must be below the eviction threshold ({evict})")]
	EdgeThresholds {
		deactivate: u32,
		evict: u32,
	},
	#[error("Contour tolerance must be positive (got {0})")]
	InvalidContourTolerance(f64),
	#[error("Edge ratio and match radius must be positive")]
	InvalidEdgeGeometry,
	#[error("Motion history must span a positive number of frames (got {0})")]
	InvalidMotionHistory(f64),
	#[error("No fiducial detector was provided")]
	MissingDetector,
	#[error("Unable to spawn tracker thread")]
	Spawn(#[from] std::io::Error),
}
