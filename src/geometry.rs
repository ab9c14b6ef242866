//! Normalized frame geometry.
//!
//! All coordinates are fractions of the frame in [0, 1]: `x` grows rightward,
//! `y` grows downward, matching the detection API's bounding boxes. Pixel
//! scaling happens only at the annotation boundary.

use serde::{Deserialize, Serialize};

/// A point in normalized frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Rectangular region in normalized frame coordinates.
///
/// Used both for the configured region of interest and for containment tests
/// against detection centroids.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub y_min: f64,
    pub x_min: f64,
    pub y_max: f64,
    pub x_max: f64,
}

impl Region {
    /// The whole frame. This is the default ROI; annotation skips drawing it.
    pub const FULL_FRAME: Region = Region {
        y_min: 0.0,
        x_min: 0.0,
        y_max: 1.0,
        x_max: 1.0,
    };

    /// Inclusive containment test. A point exactly on an edge counts as inside.
    pub fn contains(&self, point: Point) -> bool {
        (self.x_min <= point.x && point.x <= self.x_max)
            && (self.y_min <= point.y && point.y <= self.y_max)
    }

    pub fn is_full_frame(&self) -> bool {
        *self == Self::FULL_FRAME
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::FULL_FRAME
    }
}

/// True when a detection's centroid lies inside the configured ROI.
pub fn object_in_roi(roi: &Region, centroid: Point) -> bool {
    roi.contains(centroid)
}
