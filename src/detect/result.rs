//! Normalized detection records.

use serde::Serialize;

use crate::geometry::Point;

/// A localized instance of a label, normalized for matching and drawing.
///
/// Immutable once parsed; all values carry the documented rounding.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    /// Lower-cased label name.
    pub name: String,
    /// Instance confidence in [0, 100], 3 decimals.
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    /// Box center, used for ROI containment.
    pub centroid: Point,
    /// Box area as a percentage of the frame area (not pixels).
    pub box_area: f64,
}

/// Axis-aligned bounding box in normalized fractions of the frame.
///
/// Invariant: `x_max = x_min + width`, `y_max = y_min + height`, within
/// rounding tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub width: f64,
    pub height: f64,
}

/// A label reported without a localized instance (whole-frame classification).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelSummary {
    /// Lower-cased label name.
    pub name: String,
    /// Label confidence in [0, 100], 2 decimals.
    pub confidence: f64,
}

/// Everything extracted from one detection response, in response order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedFrame {
    pub detections: Vec<Detection>,
    pub labels: Vec<LabelSummary>,
}
