//! Marker tracking on top of a fiducial detector.
//!
//! A [MarkerTracker] turns a stream of color frames into a stable set of
//! [TrackedMarker]s: identities survive brief detection dropouts, each
//! marker carries the outline of the blob it sits in along with the "tips"
//! found on that outline, motion history carries missed markers along, and
//! pairs of tips are labeled by a small rule table. [TrackerWorker] runs a
//! tracker on its own thread and publishes [TrackerSnapshot]s.
pub mod util;
mod dbg;
pub mod detector;
mod preprocess;
pub mod tracker;
pub mod publish;
mod worker;

pub use dbg::{TimeProfile, TimeProfileStatistics};
pub use detector::{DetectError, FiducialDetector, RawMarker, ReplayDetector, ReplayError};
#[cfg(feature="opencv")]
pub use detector::{ArucoDetector, ArucoDictionary};
pub use preprocess::{Preprocessed, Preprocessor};
pub use tracker::{
    ContrastMode,
    MarkerTracker,
    PatternKind,
    TrackedEdge,
    TrackedMarker,
    TrackedPattern,
    TrackerBuildError,
    TrackerBuilder,
    TrackerConfig,
};
pub use publish::{EdgeSnapshot, MarkerSnapshot, PatternSnapshot, TrackerSnapshot};
pub use worker::TrackerWorker;
