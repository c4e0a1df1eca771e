//! Background tracking thread.
//!
//! Frames go in through a single-slot mailbox: [set_frame](TrackerWorker::set_frame)
//! overwrites whatever the worker has not picked up yet. The worker runs one
//! pass per period when a new frame is waiting and publishes an immutable
//! [TrackerSnapshot] that readers can hold on to.
use std::{
	any::Any,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{atomic::{AtomicBool, AtomicU64, Ordering}, Arc},
	thread::{self, JoinHandle},
	time::Instant,
};

use image::RgbImage;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
	dbg::TimeProfileStatistics,
	publish::TrackerSnapshot,
	tracker::{MarkerTracker, TrackerBuildError, TrackerConfig},
};

struct Shared {
	/// Latest frame not yet processed
	frame: Mutex<Option<RgbImage>>,
	snapshot: Mutex<Arc<TrackerSnapshot>>,
	config: RwLock<TrackerConfig>,
	config_dirty: AtomicBool,
	stop: AtomicBool,
	stats: Mutex<TimeProfileStatistics>,
	passes: AtomicU64,
}

/// A [MarkerTracker] running on its own thread at the configured rate
pub struct TrackerWorker {
	shared: Arc<Shared>,
	handle: Option<JoinHandle<()>>,
}

impl TrackerWorker {
	/// Move `tracker` onto a new thread
	pub fn spawn(tracker: MarkerTracker) -> Result<Self, TrackerBuildError> {
		let shared = Arc::new(Shared {
			frame: Mutex::new(None),
			snapshot: Mutex::new(Arc::new(tracker.snapshot())),
			config: RwLock::new(tracker.config().clone()),
			config_dirty: AtomicBool::new(false),
			stop: AtomicBool::new(false),
			stats: Mutex::new(TimeProfileStatistics::default()),
			passes: AtomicU64::new(0),
		});

		let handle = thread::Builder::new()
			.name("marker-tracker".into())
			.spawn({
				let shared = shared.clone();
				move || run(tracker, &shared)
			})?;

		Ok(Self {
			shared,
			handle: Some(handle),
		})
	}

	/// Offer the next frame. Empty frames are ignored.
	pub fn set_frame(&self, frame: RgbImage) {
		if frame.width() == 0 || frame.height() == 0 {
			return;
		}
		*self.shared.frame.lock() = Some(frame);
	}

	/// Most recently published state
	pub fn snapshot(&self) -> Arc<TrackerSnapshot> {
		self.shared.snapshot.lock().clone()
	}

	pub fn config(&self) -> TrackerConfig {
		self.shared.config.read().clone()
	}

	/// Replace the configuration, starting with the next pass
	pub fn set_config(&self, config: TrackerConfig) -> Result<(), TrackerBuildError> {
		config.validate()?;
		*self.shared.config.write() = config;
		self.shared.config_dirty.store(true, Ordering::Release);
		Ok(())
	}

	/// Number of completed passes
	pub fn passes(&self) -> u64 {
		self.shared.passes.load(Ordering::Acquire)
	}

	/// Stage timings of every pass so far
	pub fn statistics(&self) -> TimeProfileStatistics {
		self.shared.stats.lock().clone()
	}

	/// Stop the thread after its current pass and wait for it
	pub fn stop(mut self) {
		self.shutdown();
	}

	fn shutdown(&mut self) {
		let Some(handle) = self.handle.take() else {
			return;
		};
		self.shared.stop.store(true, Ordering::Release);
		handle.thread().unpark();
		if handle.join().is_err() {
			warn!("tracker thread panicked");
		}
	}
}

impl Drop for TrackerWorker {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn run(mut tracker: MarkerTracker, shared: &Shared) {
	debug!(fps = tracker.config().fps, "tracker thread started");
	while !shared.stop.load(Ordering::Acquire) {
		let started = Instant::now();

		if shared.config_dirty.swap(false, Ordering::AcqRel) {
			let config = shared.config.read().clone();
			if let Err(e) = tracker.set_config(config) {
				warn!(error = %e, "rejected tracker config");
			}
		}

		let frame = shared.frame.lock().take();
		if let Some(frame) = frame {
			match catch_unwind(AssertUnwindSafe(|| (tracker.track(&frame), tracker.snapshot()))) {
				Ok((tp, snapshot)) => {
					*shared.snapshot.lock() = Arc::new(snapshot);
					shared.stats.lock().add(&tp);
					shared.passes.fetch_add(1, Ordering::AcqRel);
				},
				Err(payload) => {
					// Markers may be half-updated
					warn!(reason = panic_reason(payload.as_ref()), "tracking pass panicked, dropping tracker state");
					tracker.reset();
				},
			}
		}

		if let Some(remaining) = tracker.config().period().checked_sub(started.elapsed()) {
			thread::park_timeout(remaining);
		}
	}
	debug!("tracker thread stopped");
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.as_str()
	} else {
		"unknown"
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use image::{GrayImage, Rgb};

	use crate::{detector::{DetectError, RawMarker}, tracker::TrackerBuilder};

	use super::*;

	fn wait_for(worker: &TrackerWorker, passes: u64) {
		let deadline = Instant::now() + Duration::from_secs(5);
		while worker.passes() < passes {
			assert!(Instant::now() < deadline, "worker stalled");
			thread::sleep(Duration::from_millis(2));
		}
	}

	#[test]
	fn publishes_snapshots() {
		let detector = |_: &GrayImage| -> Result<Vec<RawMarker>, DetectError> {
			Ok(vec![RawMarker::new(8, [[20., 40.], [40., 40.], [40., 20.], [20., 20.]])])
		};
		let config = TrackerConfig { fps: 200., ..Default::default() };
		let worker = TrackerBuilder::new(config)
			.with_detector(detector)
			.spawn()
			.unwrap();

		assert!(worker.snapshot().markers.is_empty());
		worker.set_frame(RgbImage::from_pixel(80, 60, Rgb([0, 0, 0])));
		wait_for(&worker, 1);

		let snapshot = worker.snapshot();
		assert_eq!(snapshot.frame_width, 80);
		assert_eq!(snapshot.markers.len(), 1);
		assert_eq!(snapshot.markers[0].id, 8);

		// No new frame, no new pass
		thread::sleep(Duration::from_millis(30));
		assert_eq!(worker.passes(), 1);
		assert_eq!(worker.statistics().count("detect"), 1);

		worker.set_frame(RgbImage::new(0, 0));
		thread::sleep(Duration::from_millis(30));
		assert_eq!(worker.passes(), 1);
		worker.stop();
	}

	#[test]
	fn config_changes_apply() {
		let detector = |_: &GrayImage| -> Result<Vec<RawMarker>, DetectError> { Ok(Vec::new()) };
		let worker = TrackerBuilder::default()
			.with_detector(detector)
			.spawn()
			.unwrap();

		let mut config = worker.config();
		config.identity.evict_threshold = 3;
		worker.set_config(config).unwrap();
		assert_eq!(worker.config().identity.evict_threshold, 3);

		let bad = TrackerConfig { detect_scale: 0., ..Default::default() };
		assert!(worker.set_config(bad).is_err());
		assert_eq!(worker.config().detect_scale, 1.5);
		drop(worker);
	}

	#[test]
	fn survives_panicking_pass() {
		let detector = |_: &GrayImage| -> Result<Vec<RawMarker>, DetectError> {
			Ok(vec![RawMarker::new(3, [[30., 40.], [50., 40.], [50., 20.], [30., 20.]])])
		};
		let mut tracker = TrackerBuilder::new(TrackerConfig { fps: 200., ..Default::default() })
			.with_detector(detector)
			.build()
			.unwrap();
		// Bypasses validation; polygon simplification panics on this
		tracker.config_mut().contour.approx_epsilon = 0.;
		let worker = TrackerWorker::spawn(tracker).unwrap();

		let mut frame = RgbImage::new(80, 60);
		for y in 10..50 {
			for x in 10..70 {
				frame.put_pixel(x, y, Rgb([255, 255, 255]));
			}
		}
		worker.set_frame(frame.clone());
		let deadline = Instant::now() + Duration::from_secs(5);
		while worker.shared.frame.lock().is_some() {
			assert!(Instant::now() < deadline, "frame never taken");
			thread::sleep(Duration::from_millis(2));
		}

		worker.set_config(TrackerConfig { fps: 200., ..Default::default() }).unwrap();
		worker.set_frame(frame);
		wait_for(&worker, 1);

		assert_eq!(worker.passes(), 1);
		let snapshot = worker.snapshot();
		assert_eq!(snapshot.markers.len(), 1);
		assert_eq!(snapshot.markers[0].id, 3);
		assert!(!snapshot.markers[0].polygon.is_empty());
		worker.stop();
	}
}
