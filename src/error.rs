//! Error types for the tracker, its assignment solver and the detection pipeline.

use thiserror::Error;

/// Failures of the linear-assignment solver.
///
/// All of these mean the cost matrix broke the solver's contract; none are
/// retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentError {
    #[error("cost matrix is {rows}x{cols}; non-square input requires cost extension")]
    DimensionMismatch { rows: usize, cols: usize },

    #[error("cost matrix entry ({row}, {col}) is not finite")]
    NonFiniteCost { row: usize, col: usize },

    #[error("shortest augmenting path search found no free column for row {row}")]
    PathNotFound { row: usize },

    #[error("augmenting path from row {row} is longer than the matrix")]
    AugmentOverflow { row: usize },

    #[error("{0} rows left unassigned after augmentation")]
    ResidualFreeRows(usize),
}

/// Failures of the Kalman motion filter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KalmanError {
    #[error("projected innovation covariance is singular")]
    SingularInnovation,
}

/// Invalid tracker construction parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("frame_rate must be positive")]
    ZeroFrameRate,

    #[error("{name} must lie in [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("high_thresh ({high}) must not be below track_thresh ({track})")]
    HighBelowTrackThresh { high: f32, track: f32 },
}

/// Errors surfaced by [`BYTETracker`](crate::BYTETracker).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("invalid tracker configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("assignment failed: {0}")]
    Assignment(#[from] AssignmentError),

    #[error("motion update failed: {0}")]
    Kalman(#[from] KalmanError),

    #[error("detection {index} has a non-finite field or a non-positive height")]
    InvalidDetection { index: usize },
}

/// Errors surfaced by [`TrackerPipeline`](crate::TrackerPipeline).
#[derive(Debug, Error)]
pub enum PipelineError<E> {
    #[error("detection failed: {0:?}")]
    Detection(E),

    #[error(transparent)]
    Tracking(#[from] TrackerError),
}
