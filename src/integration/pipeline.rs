//! TrackerPipeline for combining detection with tracking.

use crate::error::{PipelineError, TrackerError};
use crate::tracker::{BYTETracker, STrack, TrackerConfig};

use super::DetectionSource;

/// A detector and a [`BYTETracker`] driven together, one frame per call.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    tracker: BYTETracker,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new tracking pipeline with the given detector and tracker config.
    pub fn new(detector: D, config: TrackerConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            detector,
            tracker: BYTETracker::new(config)?,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Result<Self, TrackerError> {
        Self::new(detector, TrackerConfig::default())
    }

    /// Detect objects in one frame and return the confirmed tracks.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<STrack>, PipelineError<D::Error>> {
        let detections = self
            .detector
            .detect(input, width, height)
            .map_err(PipelineError::Detection)?;
        Ok(self.tracker.update(&detections)?)
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn tracker(&self) -> &BYTETracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut BYTETracker {
        &mut self.tracker
    }
}
