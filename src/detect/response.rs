//! Wire format of the label-detection response.
//!
//! Field names follow the service's JSON. `Labels`, `Name`, `Confidence` and
//! the four box fields are required; a response missing any of them fails
//! deserialization, which fails the frame loudly instead of corrupting
//! aggregated counts. `Instances` defaults to empty: a label with no
//! localized instances is valid data, not a malformed response.

use serde::Deserialize;

/// Top-level detection response: an ordered list of labels.
#[derive(Clone, Debug, Deserialize)]
pub struct LabelResponse {
    #[serde(rename = "Labels")]
    pub labels: Vec<LabelEntry>,
}

/// One classified label, with zero or more localized instances.
#[derive(Clone, Debug, Deserialize)]
pub struct LabelEntry {
    #[serde(rename = "Name")]
    pub name: String,

    /// Label-level confidence in [0, 100].
    #[serde(rename = "Confidence")]
    pub confidence: f64,

    #[serde(rename = "Instances", default)]
    pub instances: Vec<InstanceEntry>,
}

/// A localized instance of a label.
#[derive(Clone, Debug, Deserialize)]
pub struct InstanceEntry {
    #[serde(rename = "BoundingBox")]
    pub bounding_box: WireBox,

    /// Instance-level confidence in [0, 100].
    #[serde(rename = "Confidence")]
    pub confidence: f64,
}

/// Box as reported by the service: top-left corner plus size, all fractions
/// of the frame.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct WireBox {
    #[serde(rename = "Left")]
    pub left: f64,

    #[serde(rename = "Top")]
    pub top: f64,

    #[serde(rename = "Width")]
    pub width: f64,

    #[serde(rename = "Height")]
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_labels_with_and_without_instances() {
        let raw = r#"{
            "Labels": [
                {"Name": "Human", "Confidence": 99.85, "Instances": []},
                {"Name": "Person", "Confidence": 99.85, "Instances": [
                    {"BoundingBox": {"Width": 0.07, "Height": 0.54, "Left": 0.87, "Top": 0.29},
                     "Confidence": 99.85}
                ]}
            ],
            "LabelModelVersion": "2.0"
        }"#;

        let response: LabelResponse = serde_json::from_str(raw).expect("valid response");
        assert_eq!(response.labels.len(), 2);
        assert!(response.labels[0].instances.is_empty());
        assert_eq!(response.labels[1].instances.len(), 1);
        assert_eq!(response.labels[1].instances[0].bounding_box.left, 0.87);
    }

    #[test]
    fn missing_instances_defaults_to_empty() {
        let raw = r#"{"Labels": [{"Name": "Road", "Confidence": 71.8}]}"#;
        let response: LabelResponse = serde_json::from_str(raw).expect("valid response");
        assert!(response.labels[0].instances.is_empty());
    }

    #[test]
    fn missing_required_fields_is_an_error() {
        let no_labels = r#"{"LabelModelVersion": "2.0"}"#;
        assert!(serde_json::from_str::<LabelResponse>(no_labels).is_err());

        let no_confidence = r#"{"Labels": [{"Name": "Car"}]}"#;
        assert!(serde_json::from_str::<LabelResponse>(no_confidence).is_err());

        let truncated_box = r#"{"Labels": [{"Name": "Car", "Confidence": 99.0, "Instances": [
            {"BoundingBox": {"Width": 0.3, "Height": 0.4}, "Confidence": 99.0}
        ]}]}"#;
        assert!(serde_json::from_str::<LabelResponse>(truncated_box).is_err());
    }
}
