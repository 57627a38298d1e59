use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box stored as top, left, width, height.
///
/// Also converts to and from the other formats the tracker needs:
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYAH: Center X, Center Y, Aspect Ratio (w/h), Height
///
/// No invariant is enforced on the sign of `width` and `height`; [`Rect::iou`]
/// treats degenerate boxes as non-overlapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top edge (y of the top-left corner)
    pub top: f32,
    /// Left edge (x of the top-left corner)
    pub left: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top, left and dimensions (TLWH format).
    #[inline]
    pub fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            top: y1,
            left: x1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYAH format (center x, center y, aspect ratio, height).
    #[inline]
    pub fn from_xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        let width = aspect_ratio * height;
        Self {
            top: cy - height / 2.0,
            left: cx - width / 2.0,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.left, self.top, self.right(), self.bottom()]
    }

    /// Convert to TLWH format: (top, left, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.top, self.left, self.width, self.height]
    }

    /// Convert to XYAH format: (center_x, center_y, aspect_ratio, height).
    ///
    /// The aspect ratio is a plain `width / height`, so a zero-height box
    /// yields a non-finite ratio.
    #[inline]
    pub fn to_xyah(&self) -> [f32; 4] {
        let (cx, cy) = self.center();
        [cx, cy, self.width / self.height, self.height]
    }

    /// Get the center point of the bounding box as (x, y).
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Pixel area, counting both boundary rows and columns.
    #[inline]
    pub fn area(&self) -> f32 {
        (self.width + 1.0) * (self.height + 1.0)
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    ///
    /// Spans are measured inclusively, so two boxes that share only an edge
    /// still overlap by one pixel. If either intersection span is not
    /// positive the IoU is zero.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter_width = self.right().min(other.right()) - self.left.max(other.left) + 1.0;
        if inter_width <= 0.0 {
            return 0.0;
        }
        let inter_height = self.bottom().min(other.bottom()) - self.top.max(other.top) + 1.0;
        if inter_height <= 0.0 {
            return 0.0;
        }

        let inter_area = inter_width * inter_height;
        let union_area = self.area() + other.area() - inter_area;
        inter_area / union_area
    }
}

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((boxes_a.len(), boxes_b.len()), |(i, j)| {
        boxes_a[i].iou(&boxes_b[j])
    })
}
