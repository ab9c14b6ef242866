//! Annotated snapshot rendering and persistence.
//!
//! Draws the ROI rectangle, per-detection bounding boxes with confidence
//! labels, and centroid markers onto a decoded frame, then writes a
//! `_latest` file (always overwritten) and optionally a timestamped file.
//! Rendering is deterministic: the same frame, detections, and options
//! always produce the same image.

use anyhow::{anyhow, Result};
use image::imageops::FilterType;
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::detect::result::Detection;
use crate::geometry::Region;

mod font;

/// Objects inside the ROI.
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
/// The ROI box itself.
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
/// Objects outside the ROI.
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

/// On-disk format for annotated snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    #[default]
    Jpg,
    Png,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Jpg => "jpg",
            SaveFormat::Png => "png",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(SaveFormat::Jpg),
            "png" => Ok(SaveFormat::Png),
            other => Err(anyhow!("unsupported save format '{}'; use jpg or png", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnnotateOptions {
    /// Directory for saved snapshots. Must exist; config validation checks.
    pub directory: PathBuf,
    pub format: SaveFormat,
    /// Additionally write a `<name>_<timestamp>` file when a timestamp is
    /// available for the frame.
    pub save_timestamped: bool,
    /// Write the `_latest` file even on frames with no target hits.
    pub always_save_latest: bool,
    /// Draw ROI/boxes/markers. When off, the raw (possibly downscaled) frame
    /// is saved as-is.
    pub show_boxes: bool,
    /// Annotate only the filtered targets instead of every detection.
    pub targets_only: bool,
    /// Downscale factor in (0, 1]; 1.0 saves at capture resolution.
    pub scale: f64,
}

impl AnnotateOptions {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            format: SaveFormat::default(),
            save_timestamped: false,
            always_save_latest: true,
            show_boxes: true,
            targets_only: false,
            scale: 1.0,
        }
    }
}

/// Paths written for one frame.
#[derive(Clone, Debug, Default)]
pub struct SavedSnapshot {
    pub latest: Option<PathBuf>,
    pub timestamped: Option<PathBuf>,
}

impl SavedSnapshot {
    /// The canonical saved path: the timestamped file when present, else the
    /// `_latest` file.
    pub fn canonical(&self) -> Option<&Path> {
        self.timestamped.as_deref().or(self.latest.as_deref())
    }
}

pub struct Annotator {
    options: AnnotateOptions,
}

impl Annotator {
    pub fn new(options: AnnotateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnnotateOptions {
        &self.options
    }

    /// Render and persist one annotated frame.
    ///
    /// Undecodable bytes are logged and skipped, never raised: state and
    /// summary for the frame were computed before annotation runs. Save
    /// failures are logged the same way; the returned paths reflect only
    /// files actually written.
    pub fn annotate_and_save(
        &self,
        image_bytes: &[u8],
        detections: &[Detection],
        targets_found: &[Detection],
        roi: &Region,
        name: &str,
        timestamp: Option<&str>,
    ) -> SavedSnapshot {
        let decoded = match image::load_from_memory(image_bytes) {
            Ok(img) => img,
            Err(err) => {
                log::warn!("unable to annotate frame, bad image data: {}", err);
                return SavedSnapshot::default();
            }
        };
        let mut img = decoded.into_rgb8();

        if self.options.scale < 1.0 {
            let width = ((img.width() as f64 * self.options.scale).round() as u32).max(1);
            let height = ((img.height() as f64 * self.options.scale).round() as u32).max(1);
            img = imageops::resize(&img, width, height, FilterType::Triangle);
        }

        if self.options.show_boxes {
            if !roi.is_full_frame() {
                draw_region(&mut img, roi, GREEN, Some("ROI"));
            }
            let to_draw = if self.options.targets_only {
                targets_found
            } else {
                detections
            };
            for detection in to_draw {
                let color = if roi.contains(detection.centroid) {
                    RED
                } else {
                    YELLOW
                };
                draw_detection(&mut img, detection, color);
            }
        }

        let mut saved = SavedSnapshot::default();
        let extension = self.options.format.extension();

        let latest_path = self.options.directory.join(format!(
            "{}_latest.{}",
            valid_filename(name).to_lowercase(),
            extension
        ));
        match img.save(&latest_path) {
            Ok(()) => saved.latest = Some(latest_path),
            Err(err) => log::warn!("failed to save {}: {}", latest_path.display(), err),
        }

        if self.options.save_timestamped {
            if let Some(timestamp) = timestamp {
                let path = self.options.directory.join(format!(
                    "{}_{}.{}",
                    valid_filename(name),
                    timestamp,
                    extension
                ));
                match img.save(&path) {
                    Ok(()) => {
                        log::info!("saved snapshot {}", path.display());
                        saved.timestamped = Some(path);
                    }
                    Err(err) => log::warn!("failed to save {}: {}", path.display(), err),
                }
            }
        }

        saved
    }
}

fn draw_region(img: &mut RgbImage, region: &Region, color: Rgb<u8>, label: Option<&str>) {
    let (width, height) = (img.width() as f64, img.height() as f64);
    let x = (region.x_min * width).round() as i32;
    let y = (region.y_min * height).round() as i32;
    let box_width = (((region.x_max - region.x_min) * width).round() as u32).max(1);
    let box_height = (((region.y_max - region.y_min) * height).round() as u32).max(1);

    draw_hollow_rect_mut(img, Rect::at(x, y).of_size(box_width, box_height), color);

    if let Some(label) = label {
        font::draw_text(img, x + 2, y + 2, label, color);
    }
}

fn draw_detection(img: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
    let region = Region {
        y_min: detection.bounding_box.y_min,
        x_min: detection.bounding_box.x_min,
        y_max: detection.bounding_box.y_max,
        x_max: detection.bounding_box.x_max,
    };
    let label = format!("{}: {:.1}%", detection.name, detection.confidence);
    draw_region(img, &region, color, Some(label.as_str()));

    // Centroid bullseye.
    let cx = (detection.centroid.x * img.width() as f64).round() as i32;
    let cy = (detection.centroid.y * img.height() as f64).round() as i32;
    font::draw_text(
        img,
        cx - (font::GLYPH_WIDTH / 2) as i32,
        cy - (font::GLYPH_HEIGHT / 2) as i32,
        "X",
        color,
    );
}

static FILENAME_RE: OnceLock<Regex> = OnceLock::new();

/// Strip characters unsafe for file names; spaces become underscores.
pub fn valid_filename(name: &str) -> String {
    let re = FILENAME_RE.get_or_init(|| Regex::new(r"[^\w.-]").expect("filename pattern"));
    re.replace_all(&name.trim().replace(' ', "_"), "").into_owned()
}
