//! Fiducial detection seam.
//!
//! The tracker never decodes markers itself; it asks a [FiducialDetector]
//! for `(id, corner quad)` pairs and does everything else on top of those.
mod error;
mod replay;
#[cfg(feature="opencv")]
mod aruco;

pub use error::DetectError;
pub use replay::{ReplayDetector, ReplayError};
#[cfg(feature="opencv")]
pub use aruco::{ArucoDetector, ArucoDictionary};

use std::panic::{catch_unwind, AssertUnwindSafe};

use image::{imageops::{self, FilterType}, GrayImage};
use serde::{Deserialize, Serialize};

use crate::util::{geom::{Point2D, Quadrilateral}, math::Vec2};

/// One marker as reported by the fiducial backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMarker {
	/// Decoded marker id
	pub id: u32,
	/// Corners in the backend's fixed winding order
	pub corners: Quadrilateral,
}

impl RawMarker {
	pub fn new(id: u32, corners: [[f64; 2]; 4]) -> Self {
		Self {
			id,
			corners: Quadrilateral::from_array(&corners),
		}
	}

	/// Mean of the four corners
	pub fn center(&self) -> Point2D {
		self.corners.center()
	}

	/// The side from corner 3 to corner 0, which defines marker "forward"
	fn side(&self) -> Vec2 {
		self.corners[0] - self.corners[3]
	}

	/// Marker heading in radians (`atan2(side.x, side.y)`)
	pub fn angle(&self) -> f64 {
		let side = self.side();
		f64::atan2(side.x, side.y)
	}

	/// Edge length of the quad
	pub fn size(&self) -> f64 {
		self.side().mag()
	}
}

/// A fiducial marker detector
pub trait FiducialDetector: Send {
	/// Find all markers in a grayscale image
	fn detect(&mut self, image: &GrayImage) -> Result<Vec<RawMarker>, DetectError>;
}

impl<F> FiducialDetector for F
where
	F: FnMut(&GrayImage) -> Result<Vec<RawMarker>, DetectError> + Send,
{
	fn detect(&mut self, image: &GrayImage) -> Result<Vec<RawMarker>, DetectError> {
		self(image)
	}
}

/// Run `detector` on `image` upscaled by `scale`, mapping corners back to
/// `image` coordinates.
///
/// Backend panics are caught here so a misbehaving library can never take
/// down the tracking loop.
pub(crate) fn detect_scaled(detector: &mut dyn FiducialDetector, image: &GrayImage, scale: f32) -> Result<Vec<RawMarker>, DetectError> {
	let scaled;
	let input = if (scale - 1.).abs() > f32::EPSILON && scale > 0. {
		let width = ((image.width() as f32) * scale).round() as u32;
		let height = ((image.height() as f32) * scale).round() as u32;
		if width == 0 || height == 0 {
			return Err(DetectError::ImageTooSmall { width, height });
		}
		scaled = imageops::resize(image, width, height, FilterType::Triangle);
		&scaled
	} else {
		image
	};

	let mut markers = match catch_unwind(AssertUnwindSafe(|| detector.detect(input))) {
		Ok(result) => result?,
		Err(_) => return Err(DetectError::Panicked),
	};

	if input.dimensions() != image.dimensions() {
		let inv = 1. / scale as f64;
		for marker in markers.iter_mut() {
			marker.corners *= inv;
		}
	}
	Ok(markers)
}

#[cfg(test)]
mod test {
	use std::f64::consts::FRAC_PI_2;

	use super::*;

	#[test]
	fn raw_marker_geometry() {
		// Axis-aligned 20px square; corner 3 -> corner 0 points along +y
		let marker = RawMarker::new(7, [[10., 30.], [30., 30.], [30., 10.], [10., 10.]]);
		assert_eq!(marker.center(), Point2D::of(20., 20.));
		assert_eq!(marker.size(), 20.);
		assert_eq!(marker.angle(), 0.);

		// Rotated so the same side points along +x
		let marker = RawMarker::new(7, [[30., 10.], [30., 30.], [10., 30.], [10., 10.]]);
		assert!((marker.angle() - FRAC_PI_2).abs() < 1e-12);
	}

	#[test]
	fn scaled_detection_maps_back() {
		let image = GrayImage::new(40, 20);
		let mut seen = None;
		let mut detector = |img: &GrayImage| -> Result<Vec<RawMarker>, DetectError> {
			seen = Some(img.dimensions());
			Ok(vec![RawMarker::new(1, [[15., 15.], [30., 15.], [30., 30.], [15., 30.]])])
		};
		let markers = detect_scaled(&mut detector, &image, 1.5).unwrap();
		assert_eq!(seen, Some((60, 30)));
		assert!(markers[0].corners[0].distance_to(&Point2D::of(10., 10.)) < 1e-9);
		assert!(markers[0].corners[2].distance_to(&Point2D::of(20., 20.)) < 1e-9);
	}

	#[test]
	fn panics_become_errors() {
		let image = GrayImage::new(8, 8);
		let mut detector = |_: &GrayImage| -> Result<Vec<RawMarker>, DetectError> { panic!("backend exploded") };
		let result = detect_scaled(&mut detector, &image, 1.);
		assert!(matches!(result, Err(DetectError::Panicked)));
	}
}
