//! Stub backend for tests and demo runs. Replays a canned response.

use anyhow::Result;

use crate::detect::client::LabelDetector;
use crate::detect::response::{InstanceEntry, LabelEntry, LabelResponse, WireBox};

#[derive(Debug)]
pub struct StubDetector {
    response: LabelResponse,
}

impl StubDetector {
    /// One person in the middle of the frame plus a label-only "human" alias.
    pub fn new() -> Self {
        Self::with_response(LabelResponse {
            labels: vec![
                LabelEntry {
                    name: "Person".to_string(),
                    confidence: 99.3,
                    instances: vec![InstanceEntry {
                        bounding_box: WireBox {
                            left: 0.4,
                            top: 0.3,
                            width: 0.2,
                            height: 0.4,
                        },
                        confidence: 99.3,
                    }],
                },
                LabelEntry {
                    name: "Human".to_string(),
                    confidence: 99.3,
                    instances: vec![],
                },
            ],
        })
    }

    /// Replay an arbitrary response.
    pub fn with_response(response: LabelResponse) -> Self {
        Self { response }
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _image: &[u8]) -> Result<LabelResponse> {
        Ok(self.response.clone())
    }
}
