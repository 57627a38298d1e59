//! Matching utilities for multi-object tracking.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::AssignmentError;
use crate::tracker::lapjv;
use crate::tracker::rect::{Rect, iou_batch};

/// Detection input for the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box (top, left, width, height)
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
}

impl Detection {
    pub fn new(bbox: Rect, score: f32) -> Self {
        Self { bbox, score }
    }

    pub fn from_tlwh(top: f32, left: f32, width: f32, height: f32, score: f32) -> Self {
        Self::new(Rect::new(top, left, width, height), score)
    }

    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self::new(Rect::from_tlbr(x1, y1, x2, y2), score)
    }

    /// Whether the tracker can seed a motion model from this detection:
    /// every field finite, width non-negative and height positive.
    pub fn is_trackable(&self) -> bool {
        let Rect {
            top,
            left,
            width,
            height,
        } = self.bbox;
        [top, left, width, height, self.score]
            .iter()
            .all(|v| v.is_finite())
            && width >= 0.0
            && height > 0.0
    }
}

/// Compute IoU distance matrix between tracks and detections.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    iou_batch(track_boxes, det_boxes).mapv(|iou| 1.0 - iou)
}

/// Fold detection confidence into an IoU distance matrix: `1 - iou * score`.
pub fn fuse_score(cost_matrix: &mut Array2<f32>, detections: &[Detection]) {
    for ((_, j), cost) in cost_matrix.indexed_iter_mut() {
        let iou_sim = 1.0 - *cost;
        let fused_sim = iou_sim * detections[j].score;
        *cost = 1.0 - fused_sim;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Match tracks (rows) to detections (columns), forbidding pairs costing more than `thresh`.
///
/// An empty side leaves everything unmatched without running the solver.
pub fn linear_assignment(
    cost_matrix: &Array2<f32>,
    thresh: f32,
) -> Result<AssignmentResult, AssignmentError> {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return Ok(AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        });
    }

    let assignment = lapjv::solve(cost_matrix.view(), true, Some(thresh))?;

    Ok(AssignmentResult {
        matches: assignment.matches().collect(),
        unmatched_tracks: assignment.unmatched_rows().collect(),
        unmatched_detections: assignment.unmatched_cols().collect(),
    })
}
