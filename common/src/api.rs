use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::radius::SearchRadius;

/// Query string of `GET /api/job`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NearbyJobsQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub k: u8,
}

impl NearbyJobsQuery {
    pub fn new(origin: Coordinate, radius: SearchRadius) -> Self {
        Self {
            latitude: origin.latitude(),
            longitude: origin.longitude(),
            k: radius.km(),
        }
    }
}

/// Pulls a human-readable message out of an error response body.
///
/// Tries a JSON `detail` field, then a JSON `message` field, then a bare
/// JSON string, and finally the raw text if it is not blank.
pub fn extract_error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let from_field = |key: &str| {
            value
                .get(key)
                .and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.trim().is_empty())
        };
        if let Some(detail) = from_field("detail") {
            return Some(detail);
        }
        if let Some(message) = from_field("message") {
            return Some(message);
        }
        if let serde_json::Value::String(s) = &value {
            if !s.trim().is_empty() {
                return Some(s.clone());
            }
        }
        // Structured body with no usable message, fall back to the status text
        if value.is_object() || value.is_array() {
            return None;
        }
    }

    let text = body.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Generic message for a failed status when the server gave no usable body.
pub fn status_message(status: u16) -> String {
    match status {
        400 => "Invalid request. Please check your input.".to_string(),
        401 => "Authentication failed. Please try again.".to_string(),
        404 => "Service not found. Please try again later.".to_string(),
        500 => "Server error. Please try again later.".to_string(),
        other => format!("Server error ({}). Please try again.", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_origin() {
        let origin = Coordinate::new(30.901, 75.8573).unwrap();
        let q = NearbyJobsQuery::new(origin, SearchRadius::new(5).unwrap());
        assert_eq!(q, NearbyJobsQuery { latitude: 30.901, longitude: 75.8573, k: 5 });
    }

    #[test]
    fn test_detail_wins_over_message() {
        let body = r#"{"detail": "Token expired", "message": "other"}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("Token expired"));
    }

    #[test]
    fn test_message_field() {
        let body = r#"{"message": "Job not found"}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("Job not found"));
    }

    #[test]
    fn test_structured_detail_is_stringified() {
        let body = r#"{"detail": [{"loc": ["query", "k"], "msg": "field required"}]}"#;
        let msg = extract_error_message(body).unwrap();
        assert!(msg.contains("field required"));
    }

    #[test]
    fn test_json_string_and_plain_text() {
        assert_eq!(extract_error_message(r#""bad radius""#).as_deref(), Some("bad radius"));
        assert_eq!(extract_error_message("Bad Gateway\n").as_deref(), Some("Bad Gateway"));
    }

    #[test]
    fn test_no_message() {
        assert_eq!(extract_error_message(""), None);
        assert_eq!(extract_error_message("   "), None);
        assert_eq!(extract_error_message("{}"), None);
        assert_eq!(extract_error_message(r#"{"detail": null}"#), None);
    }

    #[test]
    fn test_status_fallbacks() {
        assert!(status_message(400).starts_with("Invalid request"));
        assert!(status_message(401).starts_with("Authentication failed"));
        assert!(status_message(404).starts_with("Service not found"));
        assert!(status_message(500).starts_with("Server error."));
        assert_eq!(status_message(503), "Server error (503). Please try again.");
    }
}
