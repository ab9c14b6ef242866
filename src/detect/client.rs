//! Detector backend trait and connection bootstrap.

use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;

use crate::detect::response::LabelResponse;

/// Fixed delay between connection attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Opaque label-detection backend.
///
/// `detect` submits one frame and blocks until the raw response is back.
/// Backends hold whatever connection state they need; the sentry serializes
/// calls, so `&mut self` is enough.
pub trait LabelDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Submit one frame, return the raw label response.
    fn detect(&mut self, image: &[u8]) -> Result<LabelResponse>;
}

/// Build a detector with a bounded retry loop.
///
/// `build` is attempted up to `retries + 1` times with a fixed one-second
/// delay between attempts. Exhausting the budget is fatal to setup: no sentry
/// is constructed without a reachable backend.
pub fn connect_with_retries<D, F>(mut build: F, retries: u32) -> Result<D>
where
    D: LabelDetector,
    F: FnMut() -> Result<D>,
{
    let mut attempt = 0;
    loop {
        match build() {
            Ok(detector) => return Ok(detector),
            Err(err) if attempt < retries => {
                attempt += 1;
                log::info!("detector connect failed (attempt {}): {:#}", attempt, err);
                thread::sleep(RETRY_DELAY);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "failed to connect detection backend after {} attempts; \
                         consider raising connect_retries",
                        attempt + 1
                    )
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::stub::StubDetector;
    use anyhow::anyhow;

    #[test]
    fn returns_first_success() {
        let detector = connect_with_retries(|| Ok(StubDetector::new()), 0).expect("connect");
        assert_eq!(detector.name(), "stub");
    }

    #[test]
    fn retries_until_success() {
        let mut attempts = 0;
        let detector = connect_with_retries(
            || {
                attempts += 1;
                if attempts < 3 {
                    Err(anyhow!("not yet"))
                } else {
                    Ok(StubDetector::new())
                }
            },
            5,
        )
        .expect("connect");
        assert_eq!(detector.name(), "stub");
        assert_eq!(attempts, 3);
    }

    #[test]
    fn exhausting_retries_is_fatal() {
        let err = connect_with_retries::<StubDetector, _>(|| Err(anyhow!("down")), 1).unwrap_err();
        assert!(format!("{:#}", err).contains("after 2 attempts"));
    }
}
