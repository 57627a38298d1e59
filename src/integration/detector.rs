//! Trait for the object detectors that feed the tracker.

use crate::tracker::Detection;

/// Anything that turns a frame into a list of scored boxes.
///
/// Inference itself lives outside this crate; implement this trait to plug
/// a detector into [`TrackerPipeline`](super::TrackerPipeline).
///
/// # Example
///
/// ```
/// use bytetrack::{Detection, DetectionSource, Rect};
///
/// struct FixedDetector;
///
/// impl DetectionSource for FixedDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, _input: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>, Self::Error> {
///         Ok(vec![Detection::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.9)])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error;

    /// Run inference on raw image data and return detections.
    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error>;
}

/// Conversion from a detector's native output into tracker detections.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// Rows of `[x1, y1, x2, y2, score]`, the usual post-NMS layout.
impl IntoDetections for Vec<[f32; 5]> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .map(|[x1, y1, x2, y2, score]| Detection::from_tlbr(x1, y1, x2, y2, score))
            .collect()
    }
}
