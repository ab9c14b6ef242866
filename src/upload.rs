//! Best-effort remote snapshot storage.
//!
//! Upload failures must never fail frame processing: the local save already
//! happened and is the result that gets reported.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use url::Url;

/// Remote object-storage boundary.
pub trait RemoteStore: Send {
    /// Store identifier for logs.
    fn name(&self) -> &'static str;

    /// Upload one local file under `key`.
    fn upload(&self, local_path: &Path, key: &str) -> Result<()>;
}

/// S3-compatible HTTP store: `PUT <endpoint>/<bucket>/<key>`.
pub struct HttpRemoteStore {
    endpoint: Url,
    bucket: String,
}

impl HttpRemoteStore {
    pub fn new(endpoint: &str, bucket: &str) -> Result<Self> {
        let mut endpoint = Url::parse(endpoint).context("parse upload endpoint")?;
        if bucket.trim().is_empty() {
            return Err(anyhow!("upload bucket must not be empty"));
        }
        if !endpoint.path().ends_with('/') {
            endpoint.set_path(&format!("{}/", endpoint.path()));
        }
        Ok(Self {
            endpoint,
            bucket: bucket.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        self.endpoint
            .join(&format!("{}/{}", self.bucket, key))
            .with_context(|| format!("build object url for key '{}'", key))
    }
}

impl RemoteStore for HttpRemoteStore {
    fn name(&self) -> &'static str {
        "http"
    }

    fn upload(&self, local_path: &Path, key: &str) -> Result<()> {
        let bytes = std::fs::read(local_path)
            .with_context(|| format!("read {}", local_path.display()))?;
        let url = self.object_url(key)?;
        ureq::put(url.as_str())
            .set("Content-Type", "application/octet-stream")
            .send_bytes(&bytes)
            .with_context(|| format!("upload {} to {}", local_path.display(), url))?;
        Ok(())
    }
}

/// Upload without failing the frame: errors are logged and swallowed.
pub fn upload_best_effort(store: &dyn RemoteStore, local_path: &Path, key: &str) {
    match store.upload(local_path, key) {
        Ok(()) => log::info!(
            "uploaded {} as '{}' via {} store",
            local_path.display(),
            key,
            store.name()
        ),
        Err(err) => log::warn!("snapshot upload failed ({}): {:#}", store.name(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_joins_bucket_and_key() {
        let store = HttpRemoteStore::new("https://storage.example.com", "snapshots").unwrap();
        let url = store.object_url("cam_2026-01-01.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/snapshots/cam_2026-01-01.jpg"
        );
    }

    #[test]
    fn endpoint_path_prefix_is_preserved() {
        let store = HttpRemoteStore::new("https://storage.example.com/v1", "media").unwrap();
        let url = store.object_url("a.png").unwrap();
        assert_eq!(url.as_str(), "https://storage.example.com/v1/media/a.png");
    }

    #[test]
    fn empty_bucket_is_rejected() {
        assert!(HttpRemoteStore::new("https://storage.example.com", " ").is_err());
    }

    #[test]
    fn best_effort_upload_swallows_missing_file() {
        let store = HttpRemoteStore::new("https://storage.example.com", "b").unwrap();
        upload_best_effort(&store, Path::new("/nonexistent/file.jpg"), "k");
    }
}
