//! ByteTrack multi-object tracking.
//!
//! The tracker keeps object identities stable across video frames by
//! predicting every track with a constant-velocity Kalman filter and
//! associating detections in two passes: first the confident ones, then
//! the low-score leftovers that would otherwise be thrown away. The
//! assignment sub-problem is solved by an embedded Jonker-Volgenant solver.
//!
//! ```
//! use bytetrack::{BYTETracker, Detection, Rect, TrackerConfig};
//!
//! let mut tracker = BYTETracker::new(TrackerConfig::default()).unwrap();
//! let detections = vec![Detection::new(Rect::new(0.0, 0.0, 50.0, 50.0), 0.9)];
//! let tracks = tracker.update(&detections).unwrap();
//! assert_eq!(tracks[0].track_id, 1);
//! ```

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{AssignmentError, ConfigError, KalmanError, PipelineError, TrackerError};
pub use integration::{DetectionBuilder, DetectionSource, IntoDetections, TrackerPipeline};
pub use tracker::{BYTETracker, Detection, Rect, STrack, TrackState, TrackerConfig};
