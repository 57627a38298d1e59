mod byte_tracker;
mod kalman_filter;
pub mod lapjv;
mod matching;
mod rect;
mod strack;
mod track_set;
mod track_state;

pub use byte_tracker::{BYTETracker, TrackerConfig};
pub use kalman_filter::KalmanFilter;
pub use lapjv::Assignment;
pub use matching::{AssignmentResult, Detection, fuse_score, iou_distance, linear_assignment};
pub use rect::{Rect, iou_batch};
pub use strack::STrack;
pub use track_set::TrackSet;
pub use track_state::TrackState;
