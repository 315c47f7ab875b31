use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Multipart field carrying the baseline image
pub const ORIGINAL_FIELD: &str = "original";
/// Multipart field carrying the current image
pub const CURRENT_FIELD: &str = "current";

/// Timestamp echoed by the comparison service.
///
/// The service emits a naive ISO-8601 local time (no offset), older
/// deployments emit RFC 3339. Both are accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceTimestamp(pub NaiveDateTime);

impl Serialize for ServiceTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }
}

impl<'de> Deserialize<'de> for ServiceTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.naive_local())
            .or_else(|_| NaiveDateTime::from_str(&s))
            .map(ServiceTimestamp)
            .map_err(serde::de::Error::custom)
    }
}

pub mod res {
    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};
    use validator::{Validate, ValidationError};

    use crate::ServiceTimestamp;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ProcessingInfo {
        pub optimized_for: String,
        pub algorithm: String,
        pub quality: String,
    }

    /// Successful comparison payload.
    ///
    /// Owned by the service: the client only reads it. `diff_filename` is the
    /// artifact id used for preview and download.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
    #[validate(schema(function = "validate_pixel_counts"))]
    pub struct ComparisonResult {
        #[validate(range(min = 0.0, max = 100.0))]
        pub similarity_percentage: f64,
        pub total_pixels: u64,
        pub different_pixels: u64,
        #[validate(length(min = 1))]
        pub diff_filename: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub image_dimensions: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub difference_ratio: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub timestamp: Option<ServiceTimestamp>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub processing_info: Option<ProcessingInfo>,
    }

    impl ComparisonResult {
        pub fn new(
            similarity_percentage: f64,
            total_pixels: u64,
            different_pixels: u64,
            diff_filename: impl Into<String>,
        ) -> Self {
            Self {
                similarity_percentage,
                total_pixels,
                different_pixels,
                diff_filename: diff_filename.into(),
                session_id: None,
                image_dimensions: None,
                difference_ratio: None,
                timestamp: None,
                processing_info: None,
            }
        }
    }

    fn validate_pixel_counts(result: &ComparisonResult) -> Result<(), ValidationError> {
        if result.different_pixels > result.total_pixels {
            let mut err = ValidationError::new("pixel_counts");
            err.message = Some("different_pixels exceeds total_pixels".into());
            return Err(err);
        }
        Ok(())
    }

    /// Raw body of `POST /api/compare`.
    ///
    /// Validation failures come back as a bare `{ "error": ... }` without
    /// `success`, so a missing flag reads as failure. The payload is only
    /// parsed once the flag says it should hold a result.
    #[derive(Debug, Deserialize)]
    pub struct CompareResponse {
        #[serde(default)]
        pub success: bool,
        #[serde(default)]
        pub error: Option<String>,
        #[serde(flatten)]
        pub payload: Map<String, Value>,
    }

    #[derive(Debug, PartialEq)]
    pub enum CompareOutcome {
        Success(ComparisonResult),
        Failure(String),
        /// `success: true` with a payload that does not parse, carries the parse error
        Malformed(String),
    }

    impl CompareResponse {
        pub fn into_outcome(self) -> CompareOutcome {
            if !self.success {
                return CompareOutcome::Failure(self.error.unwrap_or_else(|| "comparison failed".into()));
            }
            match serde_json::from_value::<ComparisonResult>(Value::Object(self.payload)) {
                Ok(result) => CompareOutcome::Success(result),
                Err(err) => CompareOutcome::Malformed(err.to_string()),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HealthStatus {
        pub status: String,
        #[serde(default)]
        pub message: String,
    }
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::res::{CompareOutcome, CompareResponse, ComparisonResult};

    #[test]
    fn success_body_maps_to_result() {
        let body = r#"{
            "success": true,
            "session_id": "abc",
            "similarity_percentage": 97.3,
            "total_pixels": 384000,
            "different_pixels": 1200,
            "image_dimensions": "480x800",
            "difference_ratio": 0.313,
            "diff_filename": "d1.png",
            "timestamp": "2025-03-04T10:11:12.345678",
            "processing_info": {
                "optimized_for": "480x800 resolution",
                "algorithm": "Enhanced multi-threshold detection",
                "quality": "High-definition output"
            }
        }"#;
        let res: CompareResponse = serde_json::from_str(body).unwrap();
        let CompareOutcome::Success(result) = res.into_outcome() else {
            panic!("expected success");
        };
        assert_eq!(result.diff_filename, "d1.png");
        assert_eq!(result.total_pixels, 384000);
        assert_eq!(result.session_id.as_deref(), Some("abc"));
        assert!(result.timestamp.is_some());
        assert!(result.validate().is_ok());
    }

    #[test]
    fn structured_failure_keeps_service_message() {
        let res: CompareResponse = serde_json::from_str(r#"{"success": false, "error": "decode failed"}"#).unwrap();
        assert_eq!(res.into_outcome(), CompareOutcome::Failure("decode failed".into()));
    }

    #[test]
    fn bare_error_without_flag_is_failure() {
        let res: CompareResponse =
            serde_json::from_str(r#"{"error": "Both original and current images are required"}"#).unwrap();
        assert_eq!(
            res.into_outcome(),
            CompareOutcome::Failure("Both original and current images are required".into())
        );
    }

    #[test]
    fn success_flag_without_payload_is_malformed() {
        let res: CompareResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        let CompareOutcome::Malformed(reason) = res.into_outcome() else {
            panic!("expected malformed");
        };
        assert!(reason.contains("similarity_percentage"));
    }

    #[test]
    fn bad_optional_field_keeps_parse_error() {
        let body = r#"{
            "success": true,
            "similarity_percentage": 97.3,
            "total_pixels": 384000,
            "different_pixels": 1200,
            "diff_filename": "d1.png",
            "timestamp": "yesterday-ish"
        }"#;
        let res: CompareResponse = serde_json::from_str(body).unwrap();
        let CompareOutcome::Malformed(reason) = res.into_outcome() else {
            panic!("expected malformed");
        };
        assert!(!reason.is_empty());
    }

    #[test]
    fn rejects_inconsistent_counts() {
        let result = ComparisonResult::new(50.0, 100, 101, "d.png");
        assert!(result.validate().is_err());

        let result = ComparisonResult::new(100.5, 100, 0, "d.png");
        assert!(result.validate().is_err());
    }
}
