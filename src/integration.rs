//! Integration module for connecting object detectors with ByteTrack.
//!
//! Detectors stay outside the crate; this module defines the seam they plug
//! into and a pipeline that runs detection and tracking for one frame.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use pipeline::TrackerPipeline;
