//! HTTP label-detection backend.
//!
//! Speaks to a Rekognition-style gateway: POST the frame bytes, get the
//! label/instance JSON back. Credentials and region travel as headers; the
//! wire protocol beyond that is the service's business.

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::config::ApiSettings;
use crate::detect::client::LabelDetector;
use crate::detect::response::LabelResponse;

const DETECT_PATH: &str = "detect-labels";

pub struct HttpDetector {
    settings: ApiSettings,
    detect_url: Url,
}

impl HttpDetector {
    /// Build a detector and probe the endpoint once.
    ///
    /// Any HTTP response counts as reachable, including error statuses; only
    /// transport failures (DNS, refused connection) are connect errors. Meant
    /// to run under [`connect_with_retries`](crate::detect::connect_with_retries).
    pub fn connect(settings: &ApiSettings) -> Result<Self> {
        let mut endpoint =
            Url::parse(&settings.endpoint).context("parse detection api endpoint")?;
        if !endpoint.path().ends_with('/') {
            endpoint.set_path(&format!("{}/", endpoint.path()));
        }
        let detect_url = endpoint
            .join(DETECT_PATH)
            .context("build detect-labels url")?;

        match ureq::get(endpoint.as_str()).call() {
            Ok(_) | Err(ureq::Error::Status(_, _)) => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("detection endpoint {} unreachable", endpoint))
            }
        }

        Ok(Self {
            settings: settings.clone(),
            detect_url,
        })
    }
}

impl LabelDetector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn detect(&mut self, image: &[u8]) -> Result<LabelResponse> {
        if image.is_empty() {
            return Err(anyhow!("refusing to submit an empty frame"));
        }

        let response = ureq::post(self.detect_url.as_str())
            .set("Content-Type", "application/octet-stream")
            .set("X-Region", &self.settings.region)
            .set("X-Access-Key-Id", &self.settings.access_key_id)
            .set("X-Secret-Access-Key", &self.settings.secret_access_key)
            .send_bytes(image)
            .context("submit frame to detection api")?;

        response
            .into_json::<LabelResponse>()
            .context("decode label response")
    }
}
