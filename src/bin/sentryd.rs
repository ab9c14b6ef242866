//! sentryd - snapshot-polling object-detection sentry daemon.
//!
//! This daemon:
//! 1. Loads configuration (TOML file + environment overrides)
//! 2. Connects the detection backend with bounded retries
//! 3. Polls the camera snapshot URL at a fixed interval
//! 4. Runs each frame through parse -> filter -> annotate -> events
//! 5. Shuts down cleanly on SIGINT

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use frame_sentry::{
    connect_with_retries, Annotator, HttpDetector, HttpRemoteStore, LogEventSink, MqttEventSink,
    ObjectSentry, SentryConfig, TargetFilter,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = SentryConfig::load()?;
    let source = cfg
        .source
        .clone()
        .ok_or_else(|| anyhow!("source.snapshot_url must be configured for sentryd"))?;

    let detector = connect_with_retries(|| HttpDetector::connect(&cfg.api), cfg.api.connect_retries)?;
    log::info!("detection backend ready at {}", cfg.api.endpoint);

    let filter = TargetFilter::new(cfg.targets.clone(), cfg.confidence, cfg.roi);
    let mut sentry = ObjectSentry::new(cfg.entity_id.clone(), Box::new(detector), filter);

    if let Some(save) = &cfg.save {
        sentry = sentry.with_annotator(Annotator::new(save.annotate_options()));
        log::info!("saving annotated snapshots to {}", save.directory.display());
    }
    if let Some(upload) = &cfg.upload {
        let store = HttpRemoteStore::new(&upload.endpoint, &upload.bucket)?;
        sentry = sentry.with_remote_store(Box::new(store), upload.key_prefix.clone());
        log::info!("uploading snapshots to bucket '{}'", upload.bucket);
    }
    sentry = match &cfg.mqtt {
        Some(mqtt) => {
            let sink = MqttEventSink::connect(mqtt).context("connect mqtt event sink")?;
            log::info!("publishing events to mqtt broker {}", mqtt.broker_addr);
            sentry.with_event_sink(Box::new(sink))
        }
        None => sentry.with_event_sink(Box::new(LogEventSink)),
    };

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("install signal handler")?;

    log::info!(
        "polling {} every {}s",
        source.snapshot_url,
        source.interval.as_secs()
    );

    while running.load(Ordering::SeqCst) {
        match fetch_snapshot(&source.snapshot_url) {
            Ok(image) => match sentry.process_image(&image) {
                Ok(()) => log::debug!("frame processed, state={}", sentry.state()),
                Err(err) => log::error!("frame processing failed: {:#}", err),
            },
            Err(err) => log::warn!("snapshot fetch failed: {:#}", err),
        }
        sleep_interruptible(&running, source.interval);
    }

    log::info!("shutting down");
    Ok(())
}

fn fetch_snapshot(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch snapshot from {}", url))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .context("read snapshot body")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty snapshot"));
    }
    Ok(bytes)
}

fn sleep_interruptible(running: &AtomicBool, interval: Duration) {
    let mut slept = Duration::ZERO;
    while running.load(Ordering::SeqCst) && slept < interval {
        let step = Duration::from_millis(250).min(interval - slept);
        std::thread::sleep(step);
        slept += step;
    }
}
