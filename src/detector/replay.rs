use std::{collections::VecDeque, io::BufRead};

use image::GrayImage;
use thiserror::Error;

use super::{DetectError, FiducialDetector, RawMarker};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReplayError {
	#[error("Unable to read detections")]
	Io(#[from] std::io::Error),
	#[error("Malformed detections on line {line}")]
	Parse {
		line: usize,
		#[source]
		source: serde_json::Error,
	},
}

/// Plays back pre-recorded detections, one batch per call.
///
/// Useful for driving the tracker without a vision backend: the image is
/// ignored and each [detect](FiducialDetector::detect) call pops the next
/// batch. Once the recording runs out every call reports no markers.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
	frames: VecDeque<Vec<RawMarker>>,
}

impl ReplayDetector {
	pub fn new(frames: impl IntoIterator<Item = Vec<RawMarker>>) -> Self {
		Self {
			frames: frames.into_iter().collect(),
		}
	}

	/// Load a JSON-lines recording: each line is an array of
	/// `{"id": .., "corners": [[x, y]; 4]}` objects. Blank lines are empty frames.
	pub fn from_jsonl(reader: impl BufRead) -> Result<Self, ReplayError> {
		let mut frames = VecDeque::new();
		for (i, line) in reader.lines().enumerate() {
			let line = line?;
			if line.trim().is_empty() {
				frames.push_back(Vec::new());
				continue;
			}
			let markers = serde_json::from_str(&line)
				.map_err(|source| ReplayError::Parse { line: i + 1, source })?;
			frames.push_back(markers);
		}
		Ok(Self { frames })
	}

	/// Batches not yet played
	pub fn remaining(&self) -> usize {
		self.frames.len()
	}
}

impl FiducialDetector for ReplayDetector {
	fn detect(&mut self, _image: &GrayImage) -> Result<Vec<RawMarker>, DetectError> {
		Ok(self.frames.pop_front().unwrap_or_default())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn loads_jsonl() {
		let text = "[{\"id\": 3, \"corners\": [[0,0],[1,0],[1,1],[0,1]]}]\n\n[]\n";
		let mut replay = ReplayDetector::from_jsonl(text.as_bytes()).unwrap();
		assert_eq!(replay.remaining(), 3);

		let image = GrayImage::new(1, 1);
		let first = replay.detect(&image).unwrap();
		assert_eq!(first.len(), 1);
		assert_eq!(first[0].id, 3);
		assert!(replay.detect(&image).unwrap().is_empty());
		assert!(replay.detect(&image).unwrap().is_empty());
		// Exhausted
		assert!(replay.detect(&image).unwrap().is_empty());
	}

	#[test]
	fn reports_bad_line() {
		let text = "[]\n{oops\n";
		match ReplayDetector::from_jsonl(text.as_bytes()) {
			Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
			other => panic!("unexpected result: {other:?}"),
		}
	}
}
