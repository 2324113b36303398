//! Shared API request/response types
//!
//! Wire format for the feed endpoints. The server produces these and the
//! client consumes them, so both sides compile against the same structs.
//! All JSON field names are camelCase.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::TimeOfDay;

// ========================================
// Feed Types
// ========================================

/// Full daily payload returned by `GET /feed`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub client_id: String,
    pub tasks: Vec<DailyTask>,
    pub daily_photo: DailyPhoto,
    pub weather: WeatherReport,
    pub greeting: String,
    pub activity: String,
    pub time_of_day: TimeOfDay,
    pub timestamp: DateTime<Utc>,
}

/// Today's photo; `url` is an empty string when nothing is available
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPhoto {
    pub url: String,
    pub caption: String,
}

/// One reminder for today with its acknowledgment state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    /// e.g. "RUOKA" (food), "LAAKE" (medication)
    pub task_type: String,
    /// Slot label, e.g. "Aamu"
    pub time_slot: String,
    pub description: String,
    pub requires_ack: bool,
    pub is_acked_today: bool,
    /// Task belongs to the slot the request fell in
    pub is_current_slot: bool,
}

/// Where the weather block came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    /// Fetched during this request
    Live,
    /// Served from the background refresher's cache
    Cached,
    /// Neutral placeholder, no usable observation
    Fallback,
}

/// Weather block of the feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// None when the report is a fallback
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub description: String,
    pub is_raining: bool,
    pub is_cold: bool,
    pub is_good_for_outdoor: bool,
    pub source: WeatherSource,
}

// ========================================
// Acknowledgment Types
// ========================================

/// Body of `POST /feed/acknowledge`
///
/// `timestamp` doubles as the authentication timestamp; `hash` is only
/// required when the server has a shared secret configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    pub client_id: String,
    pub task_type: String,
    pub time_slot: String,
    pub description: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Outcome status of an acknowledgment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    Ok,
    Error,
}

/// Response of `POST /feed/acknowledge`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeResponse {
    pub status: AckStatus,
    pub already_acked: bool,
    /// Present on errors so the UI can show a retry prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AcknowledgeResponse {
    pub fn ok(already_acked: bool) -> Self {
        Self {
            status: AckStatus::Ok,
            already_acked,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            already_acked: false,
            message: Some(message.into()),
        }
    }
}

/// One stored acknowledgment, as reported by `GET /feed/acknowledgments`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgmentEntry {
    pub date: NaiveDate,
    pub task_type: String,
    pub time_slot: String,
    pub description: String,
    pub client_id: String,
    pub acked_at: DateTime<Utc>,
}

// ========================================
// Error Response Types
// ========================================

/// Error response returned as 401 Unauthorized when authentication fails
///
/// # Examples
///
/// ```
/// use dayfeed_common::api::types::AuthErrorResponse;
///
/// let error = AuthErrorResponse {
///     error: "timestamp_invalid".to_string(),
///     message: "Request timestamp outside acceptable window".to_string(),
///     details: None,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AuthErrorResponse {
    /// Create new auth error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledge_request_uses_camel_case() {
        let json = r#"{
            "clientId": "mom",
            "taskType": "RUOKA",
            "timeSlot": "Aamu",
            "description": "Lounas",
            "timestamp": 1757404800000
        }"#;
        let request: AcknowledgeRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.client_id, "mom");
        assert_eq!(request.task_type, "RUOKA");
        assert_eq!(request.time_slot, "Aamu");
        assert!(request.hash.is_none());
    }

    #[test]
    fn test_ack_status_wire_values() {
        let ok = serde_json::to_value(AcknowledgeResponse::ok(true)).unwrap();
        assert_eq!(ok["status"], "OK");
        assert_eq!(ok["alreadyAcked"], true);
        assert!(ok.get("message").is_none());

        let err = serde_json::to_value(AcknowledgeResponse::error("ledger down")).unwrap();
        assert_eq!(err["status"], "ERROR");
        assert_eq!(err["alreadyAcked"], false);
        assert_eq!(err["message"], "ledger down");
    }

    #[test]
    fn test_feed_field_names() {
        let feed = FeedResponse {
            client_id: "mom".to_string(),
            tasks: vec![],
            daily_photo: DailyPhoto::default(),
            weather: WeatherReport {
                temperature_c: None,
                feels_like_c: None,
                description: String::new(),
                is_raining: false,
                is_cold: false,
                is_good_for_outdoor: false,
                source: WeatherSource::Fallback,
            },
            greeting: "Hyvää huomenta".to_string(),
            activity: "Kävely".to_string(),
            time_of_day: TimeOfDay::Morning,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&feed).unwrap();
        assert_eq!(value["dailyPhoto"]["url"], "");
        assert_eq!(value["weather"]["isGoodForOutdoor"], false);
        assert_eq!(value["weather"]["source"], "fallback");
        assert_eq!(value["timeOfDay"], "Aamu");
    }

    #[test]
    fn test_auth_error_response() {
        let error = AuthErrorResponse::new("timestamp_invalid", "Timestamp too old");

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("timestamp_invalid"));
        assert!(json.contains("Timestamp too old"));
    }
}
