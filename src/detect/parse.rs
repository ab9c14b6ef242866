//! Normalization of raw label responses.
//!
//! Labels carrying localized instances become one [`Detection`] per instance;
//! labels without instances become a [`LabelSummary`]. Output order follows
//! the response's label order, instances nested in reported order. Labels that
//! alias the same underlying object (e.g. "Person" and "Human") are all kept;
//! deduplication is deliberately not this layer's concern.

use crate::detect::response::LabelResponse;
use crate::detect::result::{BoundingBox, Detection, LabelSummary, ParsedFrame};
use crate::geometry::Point;

/// Geometric values and instance confidences round to 3 decimals.
const BOX_DECIMALS: i32 = 3;
/// Label-only confidences round to 2 decimals.
const LABEL_DECIMALS: i32 = 2;

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Convert a raw response into normalized detections and label summaries.
///
/// Pure and idempotent: the same response always yields the same lists.
pub fn parse_response(response: &LabelResponse) -> ParsedFrame {
    let mut detections = Vec::new();
    let mut labels = Vec::new();

    for label in &response.labels {
        if label.instances.is_empty() {
            labels.push(LabelSummary {
                name: label.name.to_lowercase(),
                confidence: round_to(label.confidence, LABEL_DECIMALS),
            });
            continue;
        }

        for instance in &label.instances {
            let wire = instance.bounding_box;
            let (x_min, y_min) = (wire.left, wire.top);
            let (x_max, y_max) = (x_min + wire.width, y_min + wire.height);

            // Area and centroid are derived from the unrounded box.
            detections.push(Detection {
                name: label.name.to_lowercase(),
                confidence: round_to(instance.confidence, BOX_DECIMALS),
                bounding_box: BoundingBox {
                    x_min: round_to(x_min, BOX_DECIMALS),
                    y_min: round_to(y_min, BOX_DECIMALS),
                    x_max: round_to(x_max, BOX_DECIMALS),
                    y_max: round_to(y_max, BOX_DECIMALS),
                    width: round_to(wire.width, BOX_DECIMALS),
                    height: round_to(wire.height, BOX_DECIMALS),
                },
                centroid: Point {
                    x: round_to(x_min + wire.width / 2.0, BOX_DECIMALS),
                    y: round_to(y_min + wire.height / 2.0, BOX_DECIMALS),
                },
                box_area: round_to(wire.width * wire.height * 100.0, BOX_DECIMALS),
            });
        }
    }

    ParsedFrame { detections, labels }
}
