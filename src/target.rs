//! Target selection and counting.
//!
//! Targets are an ordered association list, not a map: the same name may
//! appear more than once (a config mistake that must not crash), and
//! threshold resolution scans the whole list so the last configured spec for
//! a name wins.

use serde::Deserialize;

use crate::detect::result::Detection;
use crate::geometry::Region;

/// One configured target: a label name of interest with an optional
/// per-target confidence threshold.
#[derive(Clone, Debug, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    /// Falls back to the global threshold when unset.
    pub confidence: Option<f64>,
}

impl TargetSpec {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            confidence: None,
        }
    }
}

/// Ordered target list plus the global threshold and the ROI.
#[derive(Clone, Debug)]
pub struct TargetFilter {
    specs: Vec<TargetSpec>,
    default_confidence: f64,
    roi: Region,
}

impl TargetFilter {
    /// Spec names are lower-cased on entry; detection names already are.
    pub fn new(specs: Vec<TargetSpec>, default_confidence: f64, roi: Region) -> Self {
        let specs = specs
            .into_iter()
            .map(|spec| TargetSpec {
                name: spec.name.to_lowercase(),
                confidence: spec.confidence,
            })
            .collect();
        Self {
            specs,
            default_confidence,
            roi,
        }
    }

    pub fn roi(&self) -> &Region {
        &self.roi
    }

    /// Threshold for a detection name, or `None` when the name is not a
    /// configured target. Scans the whole list; the last matching spec wins.
    fn threshold_for(&self, name: &str) -> Option<f64> {
        let mut threshold = None;
        for spec in &self.specs {
            if spec.name == name {
                threshold = Some(spec.confidence.unwrap_or(self.default_confidence));
            }
        }
        threshold
    }

    /// Detections that name a configured target, strictly exceed its
    /// threshold, and have their centroid inside the ROI.
    pub fn select(&self, detections: &[Detection]) -> Vec<Detection> {
        detections
            .iter()
            .filter(|detection| match self.threshold_for(&detection.name) {
                Some(threshold) => {
                    detection.confidence > threshold && self.roi.contains(detection.centroid)
                }
                None => false,
            })
            .cloned()
            .collect()
    }

    /// Per-target counts over a filtered set, in configured order. Every
    /// configured name appears exactly once, zero-count targets included.
    pub fn summarize(&self, targets_found: &[Detection]) -> Vec<(String, usize)> {
        let mut summary: Vec<(String, usize)> = Vec::new();
        for spec in &self.specs {
            if summary.iter().any(|(name, _)| name == &spec.name) {
                continue;
            }
            let count = targets_found
                .iter()
                .filter(|detection| detection.name == spec.name)
                .count();
            summary.push((spec.name.clone(), count));
        }
        summary
    }
}
