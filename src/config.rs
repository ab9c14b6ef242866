use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::annotate::{AnnotateOptions, SaveFormat};
use crate::event::MqttSinkConfig;
use crate::geometry::Region;
use crate::target::TargetSpec;

const DEFAULT_ENTITY_ID: &str = "frame_sentry";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_CONFIDENCE: f64 = 80.0;
const DEFAULT_CONNECT_RETRIES: u32 = 5;
const DEFAULT_TARGET: &str = "person";
const DEFAULT_SCALE: f64 = 1.0;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_MQTT_TOPIC_PREFIX: &str = "frame_sentry";
const DEFAULT_MQTT_CLIENT_ID: &str = "frame_sentry";

pub const SUPPORTED_REGIONS: [&str; 15] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-central-1",
    "eu-west-2",
    "eu-west-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-2",
    "ap-northeast-1",
    "ap-south-1",
    "sa-east-1",
];

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    entity_id: Option<String>,
    confidence: Option<f64>,
    api: Option<ApiConfigFile>,
    targets: Option<Vec<TargetSpec>>,
    roi: Option<RoiConfigFile>,
    save: Option<SaveConfigFile>,
    upload: Option<UploadConfigFile>,
    source: Option<SourceConfigFile>,
    mqtt: Option<MqttConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    endpoint: Option<String>,
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    connect_retries: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RoiConfigFile {
    y_min: Option<f64>,
    x_min: Option<f64>,
    y_max: Option<f64>,
    x_max: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SaveConfigFile {
    directory: Option<PathBuf>,
    format: Option<String>,
    timestamped: Option<bool>,
    always_latest: Option<bool>,
    show_boxes: Option<bool>,
    targets_only: Option<bool>,
    scale: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct UploadConfigFile {
    endpoint: Option<String>,
    bucket: Option<String>,
    key_prefix: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    snapshot_url: Option<String>,
    interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct MqttConfigFile {
    broker_addr: Option<String>,
    topic_prefix: Option<String>,
    client_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub entity_id: String,
    /// Global confidence threshold for targets without their own.
    pub confidence: f64,
    pub api: ApiSettings,
    /// Ordered; duplicate names resolve last-match-wins downstream.
    pub targets: Vec<TargetSpec>,
    pub roi: Region,
    pub save: Option<SaveSettings>,
    pub upload: Option<UploadSettings>,
    pub source: Option<SourceSettings>,
    pub mqtt: Option<MqttSinkConfig>,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub connect_retries: u32,
}

#[derive(Debug, Clone)]
pub struct SaveSettings {
    pub directory: PathBuf,
    pub format: SaveFormat,
    pub timestamped: bool,
    pub always_latest: bool,
    pub show_boxes: bool,
    pub targets_only: bool,
    pub scale: f64,
}

impl SaveSettings {
    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions {
            directory: self.directory.clone(),
            format: self.format,
            save_timestamped: self.timestamped,
            always_save_latest: self.always_latest,
            show_boxes: self.show_boxes,
            targets_only: self.targets_only,
            scale: self.scale,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub endpoint: String,
    pub bucket: String,
    pub key_prefix: String,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub snapshot_url: String,
    pub interval: Duration,
}

impl SentryConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Result<Self> {
        let entity_id = file
            .entity_id
            .unwrap_or_else(|| DEFAULT_ENTITY_ID.to_string());
        let confidence = file.confidence.unwrap_or(DEFAULT_CONFIDENCE);

        let api_file = file.api.unwrap_or_default();
        let api = ApiSettings {
            endpoint: api_file.endpoint.unwrap_or_default(),
            region: api_file
                .region
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id: api_file.access_key_id.unwrap_or_default(),
            secret_access_key: api_file.secret_access_key.unwrap_or_default(),
            connect_retries: api_file.connect_retries.unwrap_or(DEFAULT_CONNECT_RETRIES),
        };

        let targets = file
            .targets
            .unwrap_or_else(|| vec![TargetSpec::named(DEFAULT_TARGET)]);

        let roi_file = file.roi.unwrap_or_default();
        let roi = Region {
            y_min: roi_file.y_min.unwrap_or(0.0),
            x_min: roi_file.x_min.unwrap_or(0.0),
            y_max: roi_file.y_max.unwrap_or(1.0),
            x_max: roi_file.x_max.unwrap_or(1.0),
        };

        let save = match file.save {
            Some(save_file) => match save_file.directory {
                Some(directory) => Some(SaveSettings {
                    directory,
                    format: match save_file.format.as_deref() {
                        Some(name) => SaveFormat::from_name(name)?,
                        None => SaveFormat::default(),
                    },
                    timestamped: save_file.timestamped.unwrap_or(false),
                    always_latest: save_file.always_latest.unwrap_or(true),
                    show_boxes: save_file.show_boxes.unwrap_or(true),
                    targets_only: save_file.targets_only.unwrap_or(false),
                    scale: save_file.scale.unwrap_or(DEFAULT_SCALE),
                }),
                None => {
                    return Err(anyhow!("save.directory must be set when [save] is present"))
                }
            },
            None => None,
        };

        let upload = match file.upload {
            Some(upload_file) => match (upload_file.endpoint, upload_file.bucket) {
                (Some(endpoint), Some(bucket)) => Some(UploadSettings {
                    endpoint,
                    bucket,
                    key_prefix: upload_file.key_prefix.unwrap_or_default(),
                }),
                _ => {
                    return Err(anyhow!(
                        "upload requires both upload.endpoint and upload.bucket"
                    ))
                }
            },
            None => None,
        };

        let source = file.source.and_then(|source_file| {
            source_file.snapshot_url.map(|snapshot_url| SourceSettings {
                snapshot_url,
                interval: Duration::from_secs(
                    source_file
                        .interval_secs
                        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
                ),
            })
        });

        let mqtt = file.mqtt.and_then(|mqtt_file| {
            mqtt_file.broker_addr.map(|broker_addr| MqttSinkConfig {
                broker_addr,
                topic_prefix: mqtt_file
                    .topic_prefix
                    .unwrap_or_else(|| DEFAULT_MQTT_TOPIC_PREFIX.to_string()),
                client_id: mqtt_file
                    .client_id
                    .unwrap_or_else(|| DEFAULT_MQTT_CLIENT_ID.to_string()),
                username: mqtt_file.username,
                password: mqtt_file.password,
            })
        });

        Ok(Self {
            entity_id,
            confidence,
            api,
            targets,
            roi,
            save,
            upload,
            source,
            mqtt,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(entity_id) = std::env::var("SENTRY_ENTITY_ID") {
            if !entity_id.trim().is_empty() {
                self.entity_id = entity_id;
            }
        }
        if let Ok(endpoint) = std::env::var("SENTRY_API_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.api.endpoint = endpoint;
            }
        }
        if let Ok(region) = std::env::var("SENTRY_REGION") {
            if !region.trim().is_empty() {
                self.api.region = region;
            }
        }
        if let Ok(key_id) = std::env::var("SENTRY_ACCESS_KEY_ID") {
            if !key_id.trim().is_empty() {
                self.api.access_key_id = key_id;
            }
        }
        if let Ok(secret) = std::env::var("SENTRY_SECRET_ACCESS_KEY") {
            if !secret.trim().is_empty() {
                self.api.secret_access_key = secret;
            }
        }
        if let Ok(targets) = std::env::var("SENTRY_TARGETS") {
            let parsed = split_csv(&targets);
            if !parsed.is_empty() {
                self.targets = parsed
                    .into_iter()
                    .map(|name| TargetSpec::named(&name))
                    .collect();
            }
        }
        if let Ok(confidence) = std::env::var("SENTRY_CONFIDENCE") {
            self.confidence = confidence
                .parse()
                .map_err(|_| anyhow!("SENTRY_CONFIDENCE must be a number"))?;
        }
        if let Ok(dir) = std::env::var("SENTRY_SAVE_DIR") {
            if !dir.trim().is_empty() {
                match &mut self.save {
                    Some(save) => save.directory = PathBuf::from(dir),
                    None => {
                        self.save = Some(SaveSettings {
                            directory: PathBuf::from(dir),
                            format: SaveFormat::default(),
                            timestamped: false,
                            always_latest: true,
                            show_boxes: true,
                            targets_only: false,
                            scale: DEFAULT_SCALE,
                        })
                    }
                }
            }
        }
        if let Ok(url) = std::env::var("SENTRY_SNAPSHOT_URL") {
            if !url.trim().is_empty() {
                let interval = self
                    .source
                    .as_ref()
                    .map(|source| source.interval)
                    .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
                self.source = Some(SourceSettings {
                    snapshot_url: url,
                    interval,
                });
            }
        }
        if let Ok(interval) = std::env::var("SENTRY_POLL_INTERVAL_SECS") {
            let seconds: u64 = interval
                .parse()
                .map_err(|_| anyhow!("SENTRY_POLL_INTERVAL_SECS must be an integer"))?;
            if let Some(source) = &mut self.source {
                source.interval = Duration::from_secs(seconds);
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(anyhow!("api.endpoint must be set"));
        }
        if !SUPPORTED_REGIONS.contains(&self.api.region.as_str()) {
            return Err(anyhow!("unsupported region '{}'", self.api.region));
        }

        validate_confidence("confidence", self.confidence)?;
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(anyhow!("target names must not be empty"));
            }
            if let Some(confidence) = target.confidence {
                validate_confidence(
                    &format!("target '{}' confidence", target.name),
                    confidence,
                )?;
            }
        }

        validate_fraction("roi.y_min", self.roi.y_min)?;
        validate_fraction("roi.x_min", self.roi.x_min)?;
        validate_fraction("roi.y_max", self.roi.y_max)?;
        validate_fraction("roi.x_max", self.roi.x_max)?;
        if self.roi.y_min > self.roi.y_max || self.roi.x_min > self.roi.x_max {
            return Err(anyhow!("roi min bounds must not exceed max bounds"));
        }

        if let Some(save) = &self.save {
            if !(save.scale > 0.0 && save.scale <= 1.0) {
                return Err(anyhow!("save.scale must be in (0, 1]"));
            }
            if !save.directory.is_dir() {
                return Err(anyhow!(
                    "save.directory {} does not exist",
                    save.directory.display()
                ));
            }
        }

        if let Some(source) = &self.source {
            if source.interval.as_secs() == 0 {
                return Err(anyhow!("source.interval_secs must be greater than zero"));
            }
        }

        Ok(())
    }
}

fn validate_confidence(field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 100]", field));
    }
    Ok(())
}

fn validate_fraction(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1]", field));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg: SentryConfigFile = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
