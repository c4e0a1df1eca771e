use thiserror::Error;

/// Error generated by a [fiducial backend](crate::FiducialDetector)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetectError {
	#[error("Input image was too small (width: {width}, height: {height})")]
	ImageTooSmall {
		width: u32,
		height: u32,
	},
	#[error("Fiducial backend failed: {0}")]
	Backend(String),
	#[error("Fiducial backend panicked")]
	Panicked,
	#[cfg(feature="opencv")]
	#[error(transparent)]
	OpenCv(#[from] opencv::Error),
}
