//! Single object track (STrack) for multi-object tracking.

use std::fmt;

use crate::error::KalmanError;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Single object track.
///
/// Owns its motion filter and a private copy of the latest observation: the
/// box last produced by predict or correct, together with the score of the
/// last matched detection.
#[derive(Debug, Clone)]
pub struct STrack {
    /// Unique track identifier, never reused within one tracker
    pub track_id: u64,
    /// Current track state
    pub state: TrackState,
    /// Whether the track has been confirmed by a re-match (or born on frame 1)
    pub is_confirmed: bool,
    /// Last frame the track was matched to a detection
    pub frame_id: u32,
    /// Frame ID when track was started
    pub start_frame: u32,
    /// Consecutive frames matched while in the tracked state
    pub tracklet_len: u32,
    observation: Detection,
    kalman_filter: KalmanFilter,
}

impl STrack {
    /// Start a new track from an unmatched detection.
    pub fn new(detection: &Detection, frame_id: u32, track_id: u64) -> Self {
        let mut kalman_filter = KalmanFilter::default();
        kalman_filter.initiate(&detection.bbox);

        Self {
            track_id,
            state: TrackState::Tracked,
            // Detections registered on the first frame are confirmed straight away
            is_confirmed: frame_id == 1,
            frame_id,
            start_frame: frame_id,
            tracklet_len: 0,
            observation: *detection,
            kalman_filter,
        }
    }

    /// The externally visible box: last prediction or correction.
    pub fn rect(&self) -> Rect {
        self.observation.bbox
    }

    /// Score of the detection this track was last matched with.
    pub fn score(&self) -> f32 {
        self.observation.score
    }

    /// Current observation snapshot (box plus score).
    pub fn detection(&self) -> &Detection {
        &self.observation
    }

    pub fn kalman_filter(&self) -> &KalmanFilter {
        &self.kalman_filter
    }

    pub fn end_frame(&self) -> u32 {
        self.frame_id
    }

    /// Frames between creation and the last match.
    pub fn duration(&self) -> u32 {
        self.frame_id - self.start_frame
    }

    /// Advance the motion model by one frame.
    ///
    /// Tracks that are not currently tracked coast without height velocity.
    pub fn predict(&mut self) {
        let reset = self.state != TrackState::Tracked;
        self.observation.bbox = self.kalman_filter.predict(reset);
    }

    /// Correct the track with a matched detection.
    ///
    /// A lost track that is matched again starts a fresh tracklet.
    pub fn update(&mut self, detection: &Detection, frame_id: u32) -> Result<(), KalmanError> {
        debug_assert_ne!(self.state, TrackState::Removed);

        self.observation.bbox = self.kalman_filter.update(&detection.bbox)?;
        self.observation.score = detection.score;

        if self.state == TrackState::Tracked {
            self.tracklet_len += 1;
        } else {
            self.state = TrackState::Tracked;
            self.tracklet_len = 0;
        }
        self.is_confirmed = true;
        self.frame_id = frame_id;
        Ok(())
    }

    pub fn mark_lost(&mut self) {
        if self.state != TrackState::Removed {
            self.state = TrackState::Lost;
        }
    }

    pub fn mark_removed(&mut self) {
        self.state = TrackState::Removed;
    }
}

impl fmt::Display for STrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OT_{}_({}-{})", self.track_id, self.start_frame, self.frame_id)
    }
}
