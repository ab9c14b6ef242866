//! Per-source orchestration.
//!
//! One `ObjectSentry` owns everything a camera source needs: the detection
//! backend, the target filter, the optional annotator/remote store/event
//! sink, and the retained result of the most recent frame. `process_image`
//! is the only mutation path; the host scheduler serializes frames.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::PathBuf;

use crate::annotate::Annotator;
use crate::detect::client::LabelDetector;
use crate::detect::parse::parse_response;
use crate::detect::result::{Detection, LabelSummary};
use crate::event::{EventSink, LabelDetected, ObjectDetected, SentryEvent};
use crate::target::TargetFilter;
use crate::upload::{upload_best_effort, RemoteStore};

/// Timestamp format for last-detection bookkeeping and snapshot names.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Everything derived from the most recent processed frame.
///
/// Recreated fresh on every successful frame; a failed frame leaves the
/// previous result in place.
#[derive(Clone, Debug, Default)]
pub struct FrameResult {
    /// All localized detections, response order.
    pub detections: Vec<Detection>,
    /// Labels without localized instances, response order.
    pub labels: Vec<LabelSummary>,
    /// Detections that passed target, threshold, and ROI checks.
    pub targets_found: Vec<Detection>,
    /// Per-target counts, configured order, zero-count targets included.
    pub summary: Vec<(String, usize)>,
}

pub struct ObjectSentry {
    entity_id: String,
    detector: Box<dyn LabelDetector>,
    filter: TargetFilter,
    annotator: Option<Annotator>,
    remote: Option<Box<dyn RemoteStore>>,
    remote_key_prefix: String,
    sink: Option<Box<dyn EventSink>>,
    frame: FrameResult,
    last_detection: Option<String>,
}

impl ObjectSentry {
    pub fn new(entity_id: String, detector: Box<dyn LabelDetector>, filter: TargetFilter) -> Self {
        Self {
            entity_id,
            detector,
            filter,
            annotator: None,
            remote: None,
            remote_key_prefix: String::new(),
            sink: None,
            frame: FrameResult::default(),
            last_detection: None,
        }
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    pub fn with_remote_store(mut self, store: Box<dyn RemoteStore>, key_prefix: String) -> Self {
        self.remote = Some(store);
        self.remote_key_prefix = key_prefix;
        self
    }

    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run one frame end-to-end: detect, parse, filter, annotate, notify.
    ///
    /// On a detect or parse failure the retained frame result and the
    /// last-detection timestamp stay untouched; the error propagates for the
    /// caller to log.
    pub fn process_image(&mut self, image: &[u8]) -> Result<()> {
        let response = self
            .detector
            .detect(image)
            .context("label detection failed")?;
        let parsed = parse_response(&response);

        let targets_found = self.filter.select(&parsed.detections);
        let summary = self.filter.summarize(&targets_found);

        if !targets_found.is_empty() {
            self.last_detection = Some(chrono::Local::now().format(DATETIME_FORMAT).to_string());
        }

        let saved_path = self.save_annotated(image, &parsed.detections, &targets_found);
        self.emit_events(&targets_found, &parsed.labels, saved_path.as_deref());

        self.frame = FrameResult {
            detections: parsed.detections,
            labels: parsed.labels,
            targets_found,
            summary,
        };
        Ok(())
    }

    /// Number of target hits in the most recent frame.
    pub fn state(&self) -> usize {
        self.frame.targets_found.len()
    }

    pub fn last_frame(&self) -> &FrameResult {
        &self.frame
    }

    pub fn last_detection(&self) -> Option<&str> {
        self.last_detection.as_deref()
    }

    /// Attribute surface for the host platform.
    pub fn attributes(&self) -> serde_json::Value {
        let mut summary = serde_json::Map::new();
        for (name, count) in &self.frame.summary {
            summary.insert(name.clone(), json!(count));
        }
        json!({
            "summary": summary,
            "targets_found": self.frame.targets_found,
            "labels": self.frame.labels,
            "last_detection": self.last_detection,
        })
    }

    fn save_annotated(
        &self,
        image: &[u8],
        detections: &[Detection],
        targets_found: &[Detection],
    ) -> Option<PathBuf> {
        let annotator = self.annotator.as_ref()?;
        if targets_found.is_empty() && !annotator.options().always_save_latest {
            return None;
        }

        // The timestamped file names the detection time, so it only exists on
        // frames that actually found something.
        let timestamp = if targets_found.is_empty() {
            None
        } else {
            self.last_detection.as_deref()
        };

        let saved = annotator.annotate_and_save(
            image,
            detections,
            targets_found,
            self.filter.roi(),
            &self.entity_id,
            timestamp,
        );

        if let (Some(path), Some(store)) = (&saved.timestamped, &self.remote) {
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                let key = format!("{}{}", self.remote_key_prefix, file_name);
                upload_best_effort(store.as_ref(), path, &key);
            }
        }

        saved.canonical().map(PathBuf::from)
    }

    fn emit_events(
        &mut self,
        targets_found: &[Detection],
        labels: &[LabelSummary],
        saved_path: Option<&std::path::Path>,
    ) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        for detection in targets_found {
            let event = SentryEvent::Object(ObjectDetected {
                entity_id: self.entity_id.clone(),
                name: detection.name.clone(),
                confidence: detection.confidence,
                bounding_box: detection.bounding_box,
                saved_file: saved_path.map(|path| path.display().to_string()),
            });
            if let Err(err) = sink.emit(&event) {
                log::warn!("event emission failed: {:#}", err);
            }
        }

        for label in labels {
            let event = SentryEvent::Label(LabelDetected {
                entity_id: self.entity_id.clone(),
                name: label.name.clone(),
                confidence: label.confidence,
            });
            if let Err(err) = sink.emit(&event) {
                log::warn!("event emission failed: {:#}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::stub::StubDetector;
    use crate::detect::response::{InstanceEntry, LabelEntry, LabelResponse, WireBox};
    use crate::geometry::Region;
    use crate::target::TargetSpec;
    use anyhow::anyhow;

    struct FailingDetector;

    impl LabelDetector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn detect(&mut self, _image: &[u8]) -> Result<LabelResponse> {
            Err(anyhow!("service unavailable"))
        }
    }

    fn person_filter(threshold: f64) -> TargetFilter {
        TargetFilter::new(vec![TargetSpec::named("person")], threshold, Region::default())
    }

    fn two_person_response() -> LabelResponse {
        LabelResponse {
            labels: vec![
                LabelEntry {
                    name: "Person".to_string(),
                    confidence: 99.85,
                    instances: vec![
                        InstanceEntry {
                            bounding_box: WireBox {
                                left: 0.1,
                                top: 0.1,
                                width: 0.2,
                                height: 0.3,
                            },
                            confidence: 99.85,
                        },
                        InstanceEntry {
                            bounding_box: WireBox {
                                left: 0.5,
                                top: 0.4,
                                width: 0.2,
                                height: 0.3,
                            },
                            confidence: 89.79,
                        },
                    ],
                },
                LabelEntry {
                    name: "Human".to_string(),
                    confidence: 99.85,
                    instances: vec![],
                },
            ],
        }
    }

    #[test]
    fn process_updates_state_and_summary() {
        let detector = StubDetector::with_response(two_person_response());
        let mut sentry = ObjectSentry::new(
            "sentry_front".to_string(),
            Box::new(detector),
            person_filter(95.0),
        );

        sentry.process_image(b"frame").expect("process");
        assert_eq!(sentry.state(), 1);
        assert_eq!(
            sentry.last_frame().summary,
            vec![("person".to_string(), 1)]
        );
        assert_eq!(sentry.last_frame().detections.len(), 2);
        assert_eq!(sentry.last_frame().labels.len(), 1);
        assert!(sentry.last_detection().is_some());
    }

    #[test]
    fn lower_threshold_admits_both_instances() {
        let detector = StubDetector::with_response(two_person_response());
        let mut sentry = ObjectSentry::new(
            "sentry_front".to_string(),
            Box::new(detector),
            person_filter(80.0),
        );

        sentry.process_image(b"frame").expect("process");
        assert_eq!(sentry.state(), 2);
    }

    #[test]
    fn no_detection_keeps_previous_last_detection() {
        let empty = LabelResponse {
            labels: vec![LabelEntry {
                name: "Road".to_string(),
                confidence: 70.0,
                instances: vec![],
            }],
        };
        let mut sentry = ObjectSentry::new(
            "sentry_front".to_string(),
            Box::new(StubDetector::with_response(two_person_response())),
            person_filter(80.0),
        );

        sentry.process_image(b"frame").expect("process");
        let stamp = sentry.last_detection().map(str::to_string);
        assert!(stamp.is_some());

        // Swap in a detector that finds nothing; the timestamp must survive.
        sentry.detector = Box::new(StubDetector::with_response(empty));
        sentry.process_image(b"frame").expect("process");
        assert_eq!(sentry.state(), 0);
        assert_eq!(sentry.last_detection(), stamp.as_deref());
        assert_eq!(
            sentry.last_frame().summary,
            vec![("person".to_string(), 0)]
        );
    }

    #[test]
    fn detector_failure_preserves_retained_frame() {
        let mut sentry = ObjectSentry::new(
            "sentry_front".to_string(),
            Box::new(StubDetector::with_response(two_person_response())),
            person_filter(80.0),
        );
        sentry.process_image(b"frame").expect("process");
        assert_eq!(sentry.state(), 2);

        sentry.detector = Box::new(FailingDetector);
        assert!(sentry.process_image(b"frame").is_err());
        assert_eq!(sentry.state(), 2);
        assert_eq!(sentry.last_frame().detections.len(), 2);
    }

    #[test]
    fn attributes_carry_summary_and_labels() {
        let mut sentry = ObjectSentry::new(
            "sentry_front".to_string(),
            Box::new(StubDetector::with_response(two_person_response())),
            person_filter(80.0),
        );
        sentry.process_image(b"frame").expect("process");

        let attrs = sentry.attributes();
        assert_eq!(attrs["summary"]["person"], 2);
        assert_eq!(attrs["targets_found"].as_array().unwrap().len(), 2);
        assert_eq!(attrs["labels"][0]["name"], "human");
        assert!(attrs["last_detection"].is_string());
    }
}
