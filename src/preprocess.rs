//! Contrast normalization ahead of detection.
use std::collections::VecDeque;

use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::filter::median_filter;

use crate::tracker::{ContrastMode, PreprocessConfig};

/// Working images for one pass
#[derive(Clone, Debug)]
pub struct Preprocessed {
	/// Contrast-normalized grayscale image. Detection and motion history
	/// run on this.
	pub gray: GrayImage,
	/// Foreground mask (0 or 255) that contours are extracted from
	pub binary: GrayImage,
}

/// Builds the grayscale working image from a color frame
#[derive(Debug, Default)]
pub struct Preprocessor {
	cache: VecDeque<GrayImage>,
}

fn build_lut(config: &PreprocessConfig) -> [u8; 256] {
	let mut lut = [0u8; 256];
	match config.mode {
		ContrastMode::Threshold => {
			for (i, v) in lut.iter_mut().enumerate() {
				*v = if i < config.contrast_threshold as usize { 0 } else { 255 };
			}
		},
		ContrastMode::Gamma(gamma) => {
			for (i, v) in lut.iter_mut().enumerate() {
				let x = (i as f64 / 255.).powf(gamma);
				*v = (x * 255.).round().clamp(0., 255.) as u8;
			}
		},
	}
	lut
}

impl Preprocessor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drop cached frames
	pub fn reset(&mut self) {
		self.cache.clear();
	}

	/// Frames currently cached
	pub fn cached(&self) -> usize {
		self.cache.len()
	}

	pub fn process(&mut self, frame: &RgbImage, config: &PreprocessConfig) -> Preprocessed {
		let lut = build_lut(config);
		let mut color = frame.clone();
		for px in color.pixels_mut() {
			for c in px.0.iter_mut() {
				*c = lut[*c as usize];
			}
		}
		let mut color = median_filter(&color, 1, 1);
		if config.mode == ContrastMode::Threshold {
			let level = config.contrast_threshold;
			for px in color.pixels_mut() {
				for c in px.0.iter_mut() {
					*c = if *c > level { 255 } else { 0 };
				}
			}
		}

		let gray = imageops::grayscale(&color);

		if self.cache.front().is_some_and(|cached| cached.dimensions() != gray.dimensions()) {
			self.cache.clear();
		}
		self.cache.push_back(gray.clone());
		while self.cache.len() > config.history.max(1) {
			self.cache.pop_front();
		}

		let gray = if config.average_frames && self.cache.len() > 1 {
			self.average()
		} else {
			gray
		};

		let binary = match config.mode {
			ContrastMode::Threshold => binarize(&gray, 1),
			ContrastMode::Gamma(_) => binarize(&gray, config.contrast_threshold),
		};

		Preprocessed { gray, binary }
	}

	fn average(&self) -> GrayImage {
		let (width, height) = match self.cache.front() {
			Some(first) => first.dimensions(),
			None => return GrayImage::new(0, 0),
		};
		let n = self.cache.len() as u32;
		let mut acc = vec![0u32; (width * height) as usize];
		for frame in self.cache.iter() {
			for (a, v) in acc.iter_mut().zip(frame.as_raw()) {
				*a += *v as u32;
			}
		}
		let data = acc.into_iter()
			.map(|a| ((a + n / 2) / n) as u8)
			.collect();
		GrayImage::from_raw(width, height, data)
			.unwrap_or_else(|| GrayImage::new(width, height))
	}
}

/// Pixels at or above `level` become 255, the rest 0
fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
	GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
		let Luma([v]) = *gray.get_pixel(x, y);
		Luma([if v >= level { 255 } else { 0 }])
	})
}

#[cfg(test)]
mod test {
	use image::Rgb;

	use super::*;

	fn frame(value: u8) -> RgbImage {
		let mut img = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
		for y in 4..12 {
			for x in 4..12 {
				img.put_pixel(x, y, Rgb([value, value, value]));
			}
		}
		img
	}

	#[test]
	fn thresholds_contrast() {
		let mut pre = Preprocessor::new();
		let config = PreprocessConfig::default();

		let out = pre.process(&frame(150), &config);
		assert_eq!(out.gray.get_pixel(8, 8).0, [255]);
		assert_eq!(out.gray.get_pixel(1, 1).0, [0]);
		assert_eq!(out.binary.get_pixel(8, 8).0, [255]);

		// Below the contrast threshold, the patch disappears
		let out = pre.process(&frame(90), &config);
		assert_eq!(out.gray.get_pixel(8, 8).0, [0]);
		assert_eq!(out.binary.get_pixel(8, 8).0, [0]);
	}

	#[test]
	fn gamma_keeps_levels() {
		let mut pre = Preprocessor::new();
		let config = PreprocessConfig {
			mode: ContrastMode::Gamma(1.),
			..Default::default()
		};
		let out = pre.process(&frame(150), &config);
		assert_eq!(out.gray.get_pixel(8, 8).0, [150]);
		assert_eq!(out.binary.get_pixel(8, 8).0, [255]);
	}

	#[test]
	fn cache_is_bounded() {
		let mut pre = Preprocessor::new();
		let config = PreprocessConfig::default();
		for _ in 0..5 {
			pre.process(&frame(200), &config);
		}
		assert_eq!(pre.cached(), 3);

		pre.process(&RgbImage::new(8, 8), &config);
		assert_eq!(pre.cached(), 1);
	}

	#[test]
	fn averages_cached_frames() {
		let mut pre = Preprocessor::new();
		let config = PreprocessConfig {
			average_frames: true,
			history: 2,
			..Default::default()
		};
		pre.process(&frame(200), &config);
		let out = pre.process(&frame(0), &config);
		assert_eq!(out.gray.get_pixel(8, 8).0, [128]);
	}
}
