//! frame-sentry
//!
//! Camera-frame object-detection sentry. Frames go to a cloud label-detection
//! API; the returned label/instance response is normalized, filtered by
//! per-target confidence thresholds and a configurable region of interest,
//! and aggregated into per-target counts. Optionally, an annotated copy of
//! the frame is written to disk (and uploaded to remote storage) and
//! detection events are published.
//!
//! # Module Structure
//!
//! - `geometry`: normalized points/regions and the ROI containment test
//! - `detect`: wire types, response normalization, detector backends
//! - `target`: ordered target specs, threshold resolution, counting
//! - `annotate`: box/label/centroid drawing and snapshot persistence
//! - `upload`: best-effort remote snapshot storage
//! - `event`: object/label detection events and sinks (log, MQTT)
//! - `config`: TOML + environment configuration
//! - `sentry`: the per-source orchestration façade

pub mod annotate;
pub mod config;
pub mod detect;
pub mod event;
pub mod geometry;
pub mod sentry;
pub mod target;
pub mod upload;

pub use annotate::{AnnotateOptions, Annotator, SaveFormat, SavedSnapshot};
pub use config::{ApiSettings, SentryConfig, SourceSettings, SUPPORTED_REGIONS};
pub use detect::{
    connect_with_retries, parse_response, BoundingBox, Detection, HttpDetector, LabelDetector,
    LabelResponse, LabelSummary, ParsedFrame, StubDetector,
};
pub use event::{
    EventSink, LabelDetected, LogEventSink, MqttEventSink, MqttSinkConfig, ObjectDetected,
    SentryEvent, EVENT_LABEL_DETECTED, EVENT_OBJECT_DETECTED,
};
pub use geometry::{object_in_roi, Point, Region};
pub use sentry::{FrameResult, ObjectSentry, DATETIME_FORMAT};
pub use target::{TargetFilter, TargetSpec};
pub use upload::{upload_best_effort, HttpRemoteStore, RemoteStore};
