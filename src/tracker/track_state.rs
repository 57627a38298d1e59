use serde::{Deserialize, Serialize};

/// Track state enumeration for object tracking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackState {
    /// Actively tracked object
    #[default]
    Tracked,
    /// Temporarily lost track, coasting on its motion model
    Lost,
    /// Removed from tracking; terminal
    Removed,
}
