//! End-to-end pipeline tests against the stub backend: real image bytes in,
//! state/attributes/saved files out.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use image::{Rgb, RgbImage};

use frame_sentry::{
    AnnotateOptions, Annotator, EventSink, LabelResponse, ObjectSentry, Region, SaveFormat,
    SentryEvent, StubDetector, TargetFilter, TargetSpec,
};

fn png_frame(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 40, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// Sink that records every emitted event kind.
#[derive(Clone, Default)]
struct RecordingSink {
    kinds: Arc<Mutex<Vec<&'static str>>>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &SentryEvent) -> Result<()> {
        self.kinds.lock().unwrap().push(event.kind());
        Ok(())
    }
}

fn person_sentry(threshold: f64) -> ObjectSentry {
    let filter = TargetFilter::new(
        vec![TargetSpec::named("person")],
        threshold,
        Region::default(),
    );
    ObjectSentry::new(
        "sentry_test".to_string(),
        Box::new(StubDetector::new()),
        filter,
    )
}

#[test]
fn stub_pipeline_counts_and_exposes_attributes() {
    let mut sentry = person_sentry(80.0);
    sentry.process_image(&png_frame(64, 64)).expect("process");

    assert_eq!(sentry.state(), 1);
    let attrs = sentry.attributes();
    assert_eq!(attrs["summary"]["person"], 1);
    assert_eq!(attrs["targets_found"][0]["name"], "person");
    assert_eq!(attrs["labels"][0]["name"], "human");
    assert!(attrs["last_detection"].is_string());
}

#[test]
fn annotated_latest_file_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut options = AnnotateOptions::new(dir.path().to_path_buf());
    options.format = SaveFormat::Png;

    let mut sentry = person_sentry(80.0).with_annotator(Annotator::new(options));
    sentry.process_image(&png_frame(64, 64)).expect("process");

    let latest = dir.path().join("sentry_test_latest.png");
    assert!(latest.is_file());
    let saved = image::open(&latest).expect("reload");
    assert_eq!((saved.width(), saved.height()), (64, 64));
}

#[test]
fn timestamped_file_is_written_on_detection_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut options = AnnotateOptions::new(dir.path().to_path_buf());
    options.format = SaveFormat::Png;
    options.save_timestamped = true;

    let mut sentry = person_sentry(80.0).with_annotator(Annotator::new(options));
    sentry.process_image(&png_frame(64, 64)).expect("process");

    let timestamped: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.contains("_latest"))
        .collect();
    assert_eq!(timestamped.len(), 1);
    assert!(timestamped[0].starts_with("sentry_test_"));
    assert!(timestamped[0].ends_with(".png"));
}

#[test]
fn no_save_when_threshold_filters_everything_out() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut options = AnnotateOptions::new(dir.path().to_path_buf());
    options.format = SaveFormat::Png;
    options.always_save_latest = false;

    // Stub person confidence is 99.3; a 99.9 threshold rejects it.
    let mut sentry = person_sentry(99.9).with_annotator(Annotator::new(options));
    sentry.process_image(&png_frame(64, 64)).expect("process");

    assert_eq!(sentry.state(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[test]
fn always_save_latest_writes_on_empty_frames_too() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut options = AnnotateOptions::new(dir.path().to_path_buf());
    options.format = SaveFormat::Png;

    let mut sentry = person_sentry(99.9).with_annotator(Annotator::new(options));
    sentry.process_image(&png_frame(64, 64)).expect("process");

    assert_eq!(sentry.state(), 0);
    assert!(dir.path().join("sentry_test_latest.png").is_file());
}

#[test]
fn events_fire_per_target_and_per_label() {
    let sink = RecordingSink::default();
    let kinds = sink.kinds.clone();

    let mut sentry = person_sentry(80.0).with_event_sink(Box::new(sink));
    sentry.process_image(&png_frame(64, 64)).expect("process");

    // Stub response: one person instance, one label-only "human".
    let recorded = kinds.lock().unwrap();
    assert_eq!(*recorded, vec!["object_detected", "label_detected"]);
}

#[test]
fn bad_image_bytes_do_not_fail_the_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = AnnotateOptions::new(dir.path().to_path_buf());

    let mut sentry = person_sentry(80.0).with_annotator(Annotator::new(options));
    // Detection still runs (the stub ignores the bytes); only the save is skipped.
    sentry.process_image(b"not an image").expect("process");

    assert_eq!(sentry.state(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[test]
fn roi_excludes_centroids_outside() {
    // Stub person centroid is (0.5, 0.5); an ROI covering the left edge
    // excludes it, an ROI whose edge touches it includes it.
    let excluding = Region {
        y_min: 0.0,
        x_min: 0.0,
        y_max: 1.0,
        x_max: 0.4,
    };
    let filter = TargetFilter::new(vec![TargetSpec::named("person")], 80.0, excluding);
    let mut sentry = ObjectSentry::new(
        "sentry_test".to_string(),
        Box::new(StubDetector::new()),
        filter,
    );
    sentry.process_image(&png_frame(64, 64)).expect("process");
    assert_eq!(sentry.state(), 0);

    let touching = Region {
        y_min: 0.0,
        x_min: 0.5,
        y_max: 1.0,
        x_max: 1.0,
    };
    let filter = TargetFilter::new(vec![TargetSpec::named("person")], 80.0, touching);
    let mut sentry = ObjectSentry::new(
        "sentry_test".to_string(),
        Box::new(StubDetector::new()),
        filter,
    );
    sentry.process_image(&png_frame(64, 64)).expect("process");
    assert_eq!(sentry.state(), 1);
}

#[test]
fn response_with_missing_fields_fails_the_frame_loudly() {
    let raw = r#"{"Labels": [{"Name": "Car"}]}"#;
    let parsed: Result<LabelResponse, _> = serde_json::from_str(raw);
    assert!(parsed.is_err());
}
