//! annotate - run one image through the detection pipeline.
//!
//! Useful for tuning thresholds and ROI bounds: prints the attribute JSON a
//! running sentry would expose and writes the annotated frame next to it.
//! Without an endpoint the canned stub backend is used, which needs no
//! network or credentials.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use frame_sentry::{
    connect_with_retries, AnnotateOptions, Annotator, ApiSettings, HttpDetector, LabelDetector,
    ObjectSentry, Region, SaveFormat, StubDetector, TargetFilter, TargetSpec,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one image through the detection pipeline")]
struct Args {
    /// Input image file (jpg or png).
    image: PathBuf,

    /// Detection endpoint; omit to use the canned stub backend.
    #[arg(long, env = "SENTRY_API_ENDPOINT")]
    endpoint: Option<String>,

    /// Detection API region.
    #[arg(long, env = "SENTRY_REGION", default_value = "us-east-1")]
    region: String,

    /// Detection API access key id.
    #[arg(long, env = "SENTRY_ACCESS_KEY_ID", default_value = "")]
    access_key_id: String,

    /// Detection API secret access key.
    #[arg(long, env = "SENTRY_SECRET_ACCESS_KEY", default_value = "")]
    secret_access_key: String,

    /// Connection retry budget for the HTTP backend.
    #[arg(long, default_value_t = 5)]
    connect_retries: u32,

    /// Directory for the annotated output.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Output format (jpg|png).
    #[arg(long, default_value = "jpg")]
    format: String,

    /// Comma-separated target names to count.
    #[arg(long, default_value = "person")]
    targets: String,

    /// Global confidence threshold.
    #[arg(long, default_value_t = 80.0)]
    confidence: f64,

    /// Region of interest as y_min,x_min,y_max,x_max (fractions).
    #[arg(long, value_name = "Y_MIN,X_MIN,Y_MAX,X_MAX")]
    roi: Option<String>,

    /// Skip box drawing; save the raw frame only.
    #[arg(long)]
    no_boxes: bool,

    /// Entity identifier used in file names and attributes.
    #[arg(long, default_value = "annotate_cli")]
    entity_id: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let image = std::fs::read(&args.image)
        .with_context(|| format!("read image {}", args.image.display()))?;

    let detector: Box<dyn LabelDetector> = match &args.endpoint {
        Some(endpoint) => {
            let settings = ApiSettings {
                endpoint: endpoint.clone(),
                region: args.region.clone(),
                access_key_id: args.access_key_id.clone(),
                secret_access_key: args.secret_access_key.clone(),
                connect_retries: args.connect_retries,
            };
            Box::new(connect_with_retries(
                || HttpDetector::connect(&settings),
                args.connect_retries,
            )?)
        }
        None => {
            log::info!("no endpoint configured, using the stub backend");
            Box::new(StubDetector::new())
        }
    };

    let roi = parse_roi(args.roi.as_deref())?;
    let targets: Vec<TargetSpec> = args
        .targets
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(TargetSpec::named)
        .collect();
    if targets.is_empty() {
        return Err(anyhow!("at least one target name is required"));
    }

    let mut options = AnnotateOptions::new(args.out_dir.clone());
    options.format = SaveFormat::from_name(&args.format)?;
    options.show_boxes = !args.no_boxes;

    let filter = TargetFilter::new(targets, args.confidence, roi);
    let mut sentry = ObjectSentry::new(args.entity_id.clone(), detector, filter)
        .with_annotator(Annotator::new(options));

    sentry.process_image(&image)?;

    println!("{}", serde_json::to_string_pretty(&sentry.attributes())?);
    Ok(())
}

fn parse_roi(raw: Option<&str>) -> Result<Region> {
    let Some(raw) = raw else {
        return Ok(Region::default());
    };
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("invalid roi component '{}'", part))
        })
        .collect::<Result<_>>()?;
    if parts.len() != 4 {
        return Err(anyhow!("roi needs exactly four components, got {}", parts.len()));
    }
    Ok(Region {
        y_min: parts[0],
        x_min: parts[1],
        y_max: parts[2],
        x_max: parts[3],
    })
}
