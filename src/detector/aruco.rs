use std::str::FromStr;

use image::GrayImage;
use opencv::{
	core::{Mat, Point2f, Scalar, Vector, CV_8UC1},
	objdetect::{self, DetectorParameters, PredefinedDictionaryType, RefineParameters},
	prelude::*,
};

use super::{DetectError, FiducialDetector, RawMarker};

/// Predefined ArUco dictionaries exposed to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ArucoDictionary {
	#[default]
	Dict4x4_50,
	Dict4x4_100,
	Dict5x5_100,
	Dict6x6_250,
	Original,
}

impl ArucoDictionary {
	fn predefined(self) -> PredefinedDictionaryType {
		match self {
			Self::Dict4x4_50 => PredefinedDictionaryType::DICT_4X4_50,
			Self::Dict4x4_100 => PredefinedDictionaryType::DICT_4X4_100,
			Self::Dict5x5_100 => PredefinedDictionaryType::DICT_5X5_100,
			Self::Dict6x6_250 => PredefinedDictionaryType::DICT_6X6_250,
			Self::Original => PredefinedDictionaryType::DICT_ARUCO_ORIGINAL,
		}
	}

	pub fn names() -> &'static [&'static str] {
		&["4x4_50", "4x4_100", "5x5_100", "6x6_250", "original"]
	}
}

impl FromStr for ArucoDictionary {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"4x4_50" => Ok(Self::Dict4x4_50),
			"4x4_100" => Ok(Self::Dict4x4_100),
			"5x5_100" => Ok(Self::Dict5x5_100),
			"6x6_250" => Ok(Self::Dict6x6_250),
			"original" => Ok(Self::Original),
			other => Err(format!("unknown ArUco dictionary '{other}' (expected one of {:?})", Self::names())),
		}
	}
}

/// [FiducialDetector] backed by OpenCV's ArUco module
pub struct ArucoDetector {
	inner: objdetect::ArucoDetector,
}

impl ArucoDetector {
	pub fn new(dictionary: ArucoDictionary) -> Result<Self, DetectError> {
		let dictionary = objdetect::get_predefined_dictionary(dictionary.predefined())?;
		let params = DetectorParameters::default()?;
		let refine = RefineParameters::new(10., 3., true)?;
		let inner = objdetect::ArucoDetector::new(&dictionary, &params, refine)?;
		Ok(Self { inner })
	}
}

impl FiducialDetector for ArucoDetector {
	fn detect(&mut self, image: &GrayImage) -> Result<Vec<RawMarker>, DetectError> {
		let (width, height) = image.dimensions();
		if width == 0 || height == 0 {
			return Err(DetectError::ImageTooSmall { width, height });
		}

		let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC1, Scalar::all(0.))?;
		mat.data_bytes_mut()?.copy_from_slice(image.as_raw());

		let mut corners = Vector::<Vector<Point2f>>::new();
		let mut ids = Vector::<i32>::new();
		let mut rejected = Vector::<Vector<Point2f>>::new();
		self.inner.detect_markers(&mat, &mut corners, &mut ids, &mut rejected)?;

		let markers = ids.iter()
			.zip(corners.iter())
			.filter(|(id, quad)| *id >= 0 && quad.len() == 4)
			.map(|(id, quad)| {
				let mut pts = [[0f64; 2]; 4];
				for (dst, src) in pts.iter_mut().zip(quad.iter()) {
					*dst = [src.x as f64, src.y as f64];
				}
				RawMarker::new(id as u32, pts)
			})
			.collect();
		Ok(markers)
	}
}
