//! Motion history, and rigid-motion recovery of markers that direct
//! detection missed.
//!
//! The history is a per-pixel record of the last time (in milliseconds)
//! that pixel changed. Regions of recent motion are segmented out of it, and
//! each region gets a dominant orientation from the history's gradient.
use std::collections::VecDeque;

use image::GrayImage;
use imageproc::{distance_transform::Norm, filter::median_filter, morphology::dilate};
use rayon::prelude::*;
use tracing::trace;

use crate::util::{geom::Rect, math::{mod360_pos, wrap_delta_deg}};

use super::{marker::MotionAnchor, MotionConfig, TrackedMarker};

/// Orientation histogram resolution
const ORIENTATION_BINS: usize = 12;
const BIN_WIDTH: f64 = 360. / ORIENTATION_BINS as f64;

/// A connected area of recent motion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionRegion {
	pub rect: Rect,
	/// Dominant direction of motion in degrees, `[0, 360)`
	pub orientation: f64,
}

#[derive(Debug, Default)]
pub struct MotionHistory {
	width: usize,
	height: usize,
	previous: Option<GrayImage>,
	/// Last-changed timestamp per pixel, zero where nothing moved recently
	history: Vec<f64>,
	/// Gradient direction per pixel, in degrees
	orientation: Vec<f64>,
	/// Pixels where [orientation](Self::orientation) is meaningful
	valid: Vec<bool>,
}

impl MotionHistory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Forget the previous frame and all history
	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Timestamp recorded for pixel `(x, y)`
	pub fn timestamp_at(&self, x: u32, y: u32) -> Option<f64> {
		let (x, y) = (x as usize, y as usize);
		if x >= self.width || y >= self.height {
			return None;
		}
		Some(self.history[y * self.width + x])
	}

	/// Feed the next working image, stamped `timestamp` ms.
	///
	/// Returns the regions larger than [MotionConfig::min_area] that moved
	/// within the last `duration` ms. The first frame (and any frame whose
	/// size differs from the previous one) only primes the history.
	pub fn update(&mut self, gray: &GrayImage, timestamp: f64, duration: f64, config: &MotionConfig) -> Vec<MotionRegion> {
		let mut current = median_filter(gray, 1, 1);
		if config.dilate_radius > 0 {
			current = dilate(&current, Norm::LInf, config.dilate_radius);
		}

		let previous = match self.previous.take() {
			Some(previous) if previous.dimensions() == current.dimensions() => previous,
			_ => {
				let (width, height) = current.dimensions();
				self.width = width as usize;
				self.height = height as usize;
				self.history = vec![0.; self.width * self.height];
				self.orientation = vec![0.; self.width * self.height];
				self.valid = vec![false; self.width * self.height];
				self.previous = Some(current);
				return Vec::new();
			}
		};

		// Zero marks "no motion", so stamps must stay positive
		let timestamp = timestamp.max(f64::MIN_POSITIVE);
		self.stamp(&previous, &current, timestamp, duration);
		self.previous = Some(current);

		self.compute_gradient(config);

		self.segment(timestamp, duration)
			.into_iter()
			.filter(|rect| rect.area() > config.min_area)
			.map(|rect| MotionRegion {
				rect,
				orientation: self.global_orientation(rect, timestamp, duration),
			})
			.collect()
	}

	/// Stamp changed pixels and clear stale ones
	fn stamp(&mut self, previous: &GrayImage, current: &GrayImage, timestamp: f64, duration: f64) {
		let stale = timestamp - duration;
		for ((h, a), b) in self.history.iter_mut().zip(previous.as_raw()).zip(current.as_raw()) {
			if a != b {
				*h = timestamp;
			} else if *h < stale {
				*h = 0.;
			}
		}
	}

	#[inline]
	fn at(&self, x: isize, y: isize) -> f64 {
		let x = x.clamp(0, self.width as isize - 1) as usize;
		let y = y.clamp(0, self.height as isize - 1) as usize;
		self.history[y * self.width + x]
	}

	/// 3x3 Sobel direction of the history, valid only where the local spread
	/// of timestamps lies in [MotionConfig::gradient_delta] and no neighbor is
	/// empty.
	fn compute_gradient(&mut self, config: &MotionConfig) {
		let width = self.width;
		let delta = config.gradient_delta.clone();
		let this = &*self;
		let rows: Vec<(Vec<f64>, Vec<bool>)> = (0..self.height)
			.into_par_iter()
			.map(|y| {
				let mut orientation = vec![0.; width];
				let mut valid = vec![false; width];
				let y = y as isize;
				for x in 0..width {
					let x = x as isize;
					let mut window = [0f64; 9];
					for (i, v) in window.iter_mut().enumerate() {
						let dx = (i % 3) as isize - 1;
						let dy = (i / 3) as isize - 1;
						*v = this.at(x + dx, y + dy);
					}
					if window.iter().any(|v| *v == 0.) {
						continue;
					}
					let max = window.iter().copied().fold(f64::MIN, f64::max);
					let min = window.iter().copied().fold(f64::MAX, f64::min);
					let spread = max - min;
					if spread < delta.start || spread > delta.end {
						continue;
					}

					let gx = (window[2] + 2. * window[5] + window[8]) - (window[0] + 2. * window[3] + window[6]);
					let gy = (window[6] + 2. * window[7] + window[8]) - (window[0] + 2. * window[1] + window[2]);
					if gx == 0. && gy == 0. {
						continue;
					}
					orientation[x as usize] = mod360_pos(gy.atan2(gx).to_degrees());
					valid[x as usize] = true;
				}
				(orientation, valid)
			})
			.collect();

		for (y, (orientation, valid)) in rows.into_iter().enumerate() {
			let row = y * width .. (y + 1) * width;
			self.orientation[row.clone()].copy_from_slice(&orientation);
			self.valid[row].copy_from_slice(&valid);
		}
	}

	/// Bounds of 4-connected components seeded at pixels stamped `timestamp`.
	///
	/// Neighbors join a component while their stamps differ by at most
	/// `threshold`.
	fn segment(&self, timestamp: f64, threshold: f64) -> Vec<Rect> {
		let (width, height) = (self.width, self.height);
		let mut labeled = vec![false; width * height];
		let mut queue = VecDeque::new();
		let mut regions = Vec::new();

		for seed in 0..width * height {
			if labeled[seed] || self.history[seed] != timestamp {
				continue;
			}
			labeled[seed] = true;
			queue.push_back(seed);
			let (mut x0, mut y0, mut x1, mut y1) = (usize::MAX, usize::MAX, 0, 0);

			while let Some(idx) = queue.pop_front() {
				let (x, y) = (idx % width, idx / width);
				x0 = x0.min(x);
				y0 = y0.min(y);
				x1 = x1.max(x);
				y1 = y1.max(y);

				let value = self.history[idx];
				let neighbors = [
					(x > 0).then(|| idx - 1),
					(x + 1 < width).then(|| idx + 1),
					(y > 0).then(|| idx - width),
					(y + 1 < height).then(|| idx + width),
				];
				for n in neighbors.into_iter().flatten() {
					let h = self.history[n];
					if !labeled[n] && h != 0. && (h - value).abs() <= threshold {
						labeled[n] = true;
						queue.push_back(n);
					}
				}
			}

			regions.push(Rect::new(x0 as i32, y0 as i32, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32));
		}
		regions
	}

	/// Dominant gradient direction inside `rect`, in degrees.
	///
	/// Takes the peak of an orientation histogram, then shifts it by the
	/// mean offset of every valid pixel, weighting recent pixels higher.
	fn global_orientation(&self, rect: Rect, timestamp: f64, duration: f64) -> f64 {
		let Some(rect) = rect.clip(self.width as u32, self.height as u32) else {
			return 0.;
		};
		let pixels = move || {
			(rect.y as usize .. rect.y as usize + rect.height as usize)
				.flat_map(move |y| (rect.x as usize .. rect.x as usize + rect.width as usize).map(move |x| y * self.width + x))
				.filter(move |idx| self.valid[*idx])
		};

		let mut histogram = [0usize; ORIENTATION_BINS];
		for idx in pixels() {
			let bin = ((self.orientation[idx] / BIN_WIDTH) as usize).min(ORIENTATION_BINS - 1);
			histogram[bin] += 1;
		}
		let Some((peak, count)) = histogram.iter()
			.enumerate()
			.fold(None, |best: Option<(usize, usize)>, (i, &c)| match best {
				Some((_, best_count)) if best_count >= c => best,
				_ => Some((i, c)),
			}) else {
			return 0.;
		};
		if count == 0 {
			return 0.;
		}
		let base = peak as f64 * BIN_WIDTH;

		let stale = timestamp - duration;
		let mut shift = 0.;
		let mut total = 0.;
		for idx in pixels() {
			let weight = ((self.history[idx] - stale) / duration).max(0.);
			shift += weight * wrap_delta_deg(self.orientation[idx] - base);
			total += weight;
		}
		if total > f64::EPSILON {
			mod360_pos(base + shift / total)
		} else {
			base
		}
	}
}

/// Move markers missed by detection along with the motion region they sit in.
///
/// Every region that overlaps a marker (its center, or the center of its
/// bounds) re-anchors that marker. Markers detected this pass stop there;
/// the others are carried by the region's translation and rotation since the
/// previous anchor. Returns the ids of recovered markers.
pub fn recover(markers: &mut [TrackedMarker], regions: &[MotionRegion], config: &MotionConfig) -> Vec<u32> {
	let mut recovered = Vec::new();
	for region in regions {
		let center = region.rect.center();
		let angle = -region.orientation;

		for marker in markers.iter_mut() {
			let overlaps = region.rect.contains(&marker.position)
				|| (!marker.bounding_rect.is_empty() && region.rect.contains(&marker.bounding_rect.center()));
			if !overlaps {
				continue;
			}

			let Some(anchor) = marker.anchor.replace(MotionAnchor { position: center, angle }) else {
				continue;
			};
			if marker.checked {
				continue;
			}

			let offset = center - anchor.position;
			let mut da = wrap_delta_deg(angle - anchor.angle);
			if da.abs() > config.max_angle_jump {
				da = 0.;
			}
			trace!(marker = marker.id, dx = offset.x, dy = offset.y, da, "recovered from motion");
			marker.apply_rigid_motion(offset, da.to_radians());
			if !recovered.contains(&marker.id) {
				recovered.push(marker.id);
			}
		}
	}
	recovered
}

#[cfg(test)]
mod test {
	use image::Luma;

	use crate::{detector::RawMarker, util::{geom::Point2D, math::Vec2}};

	use super::*;

	/// White from the left edge up to `edge`, between rows 20 and 120
	fn sweep(edge: u32) -> GrayImage {
		GrayImage::from_fn(200, 160, |x, y| {
			Luma([if x < edge && (20..120).contains(&y) { 255 } else { 0 }])
		})
	}

	#[test]
	fn first_frame_primes() {
		let mut mhi = MotionHistory::new();
		let config = MotionConfig::default();
		assert!(mhi.update(&sweep(60), 1000., 166., &config).is_empty());
		assert_eq!(mhi.timestamp_at(0, 0), Some(0.));
	}

	#[test]
	fn sweeping_edge_moves_right() {
		let mut mhi = MotionHistory::new();
		let config = MotionConfig::default();
		let duration = 1000. / 30. * 5.;
		let mut regions = Vec::new();
		for k in 0..7 {
			let ts = 1000. + 33. * k as f64;
			regions = mhi.update(&sweep(60 + 10 * k), ts, duration, &config);
		}
		assert_eq!(regions.len(), 1);
		let region = regions[0];
		assert!(region.rect.area() > config.min_area);
		assert!(region.orientation < 5. || region.orientation > 355., "orientation {}", region.orientation);
		// The newest stripe sits at the right of the region
		assert!(region.rect.contains(&Point2D::of(115., 70.)));
	}

	#[test]
	fn still_frames_have_no_regions() {
		let mut mhi = MotionHistory::new();
		let config = MotionConfig::default();
		let frame = sweep(80);
		mhi.update(&frame, 1000., 166., &config);
		assert!(mhi.update(&frame, 1033., 166., &config).is_empty());
	}

	fn marker_at(x: f64, y: f64) -> TrackedMarker {
		let raw = RawMarker::new(9, [[x - 10., y + 10.], [x + 10., y + 10.], [x + 10., y - 10.], [x - 10., y - 10.]]);
		let mut marker = TrackedMarker::new(&raw);
		marker.checked = false;
		marker
	}

	#[test]
	fn first_overlap_only_anchors() {
		let mut markers = vec![marker_at(50., 50.)];
		let region = MotionRegion { rect: Rect::new(0, 0, 100, 100), orientation: 10. };
		let recovered = recover(&mut markers, &[region], &MotionConfig::default());
		assert!(recovered.is_empty());
		assert_eq!(markers[0].position, Point2D::of(50., 50.));
		assert_eq!(markers[0].anchor, Some(MotionAnchor { position: Point2D::of(50., 50.), angle: -10. }));
	}

	#[test]
	fn detected_markers_only_reanchor() {
		let mut markers = vec![marker_at(50., 50.)];
		markers[0].checked = true;
		markers[0].anchor = Some(MotionAnchor { position: Point2D::of(40., 40.), angle: 0. });
		let region = MotionRegion { rect: Rect::new(10, 10, 100, 100), orientation: 0. };
		assert!(recover(&mut markers, &[region], &MotionConfig::default()).is_empty());
		assert_eq!(markers[0].position, Point2D::of(50., 50.));
		assert_eq!(markers[0].anchor.unwrap().position, Point2D::of(60., 60.));
	}

	#[test]
	fn missed_marker_follows_region() {
		let mut markers = vec![marker_at(50., 50.)];
		markers[0].polygon = vec![Point2D::of(70., 50.), Point2D::of(50., 20.), Point2D::of(30., 50.), Point2D::of(50., 80.)];
		markers[0].anchor = Some(MotionAnchor { position: Point2D::of(45., 45.), angle: -20. });
		markers[0].lost_count = 2;

		// Region center (55, 50) and angle -30deg: moved (10, 5), turned -10deg
		let region = MotionRegion { rect: Rect::new(5, 0, 100, 100), orientation: 30. };
		let recovered = recover(&mut markers, &[region], &MotionConfig::default());
		assert_eq!(recovered, vec![9]);

		let marker = &markers[0];
		assert!(marker.position.distance_to(&Point2D::of(60., 55.)) < 1e-9);
		assert!((marker.angle - (-10f64).to_radians()).abs() < 1e-9);
		assert_eq!(marker.lost_count, 0);
		let expected = Point2D::of(60., 55.) + Vec2::of(20., 0.).rotate(10f64.to_radians());
		assert!(marker.polygon[0].distance_to(&expected) < 1e-9);
	}

	#[test]
	fn large_rotations_are_ignored() {
		let mut markers = vec![marker_at(50., 50.)];
		markers[0].anchor = Some(MotionAnchor { position: Point2D::of(50., 50.), angle: 0. });
		let region = MotionRegion { rect: Rect::new(0, 0, 100, 100), orientation: 150. };
		recover(&mut markers, &[region], &MotionConfig::default());
		assert_eq!(markers[0].angle, 0.);
	}
}
