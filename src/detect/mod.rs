//! Detection API boundary.
//!
//! The cloud call is opaque: a backend takes frame bytes and returns the raw
//! label/instance response. Everything downstream of that — normalization,
//! filtering, annotation — is deterministic local work.

pub mod backends;
pub mod client;
pub mod parse;
pub mod response;
pub mod result;

pub use backends::http::HttpDetector;
pub use backends::stub::StubDetector;
pub use client::{connect_with_retries, LabelDetector};
pub use parse::parse_response;
pub use response::{InstanceEntry, LabelEntry, LabelResponse, WireBox};
pub use result::{BoundingBox, Detection, LabelSummary, ParsedFrame};
