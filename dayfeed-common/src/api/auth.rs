//! Request signing shared by the feed server and its clients
//!
//! A signed request carries two extra fields:
//!
//! - `timestamp`: Unix epoch milliseconds, checked against a skew window
//! - `hash`: SHA-256 over the canonical JSON of the request with `hash`
//!   set to 64 zeros, followed by the shared secret in decimal
//!
//! POST bodies are hashed as sent. GET requests put both fields in the
//! query string; the parameters are hashed as a JSON object of strings,
//! with `timestamp` kept numeric. A shared secret of 0 turns signing off.
//!
//! Nothing here depends on axum or reqwest.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use thiserror::Error;

use crate::time::now_millis;

/// Placeholder substituted for the hash field before hashing
pub const DUMMY_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Why a request failed authentication
#[derive(Debug, Clone, Error)]
pub enum ApiAuthError {
    #[error("Invalid timestamp: {reason}")]
    InvalidTimestamp {
        timestamp: i64,
        now: i64,
        reason: String,
    },

    #[error("Invalid hash")]
    InvalidHash { provided: String, calculated: String },

    #[error("Missing timestamp field")]
    MissingTimestamp,

    #[error("Missing hash field")]
    MissingHash,

    #[error("Parse error: {0}")]
    ParseError(String),
}

// ========================================
// Timestamp window
// ========================================

/// Accepted clock skew between client and server
///
/// The tablet's clock is not synchronized with the server, and the client
/// waits up to several seconds between retries, so the window is wider
/// than a same-host service would use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampWindow {
    /// How far in the past a timestamp may be (ms)
    pub max_past_ms: i64,
    /// How far in the future a timestamp may be (ms)
    pub max_future_ms: i64,
}

impl Default for TimestampWindow {
    fn default() -> Self {
        Self {
            max_past_ms: 300_000,
            max_future_ms: 5_000,
        }
    }
}

/// Check `timestamp` against the server clock
///
/// ```
/// use dayfeed_common::api::auth::{validate_timestamp, TimestampWindow};
/// use dayfeed_common::time::now_millis;
///
/// let window = TimestampWindow { max_past_ms: 1000, max_future_ms: 1 };
/// let now = now_millis();
///
/// assert!(validate_timestamp(now - 500, &window).is_ok());
/// assert!(validate_timestamp(now - 2000, &window).is_err());
/// ```
pub fn validate_timestamp(timestamp: i64, window: &TimestampWindow) -> Result<(), ApiAuthError> {
    validate_timestamp_at(timestamp, now_millis(), window)
}

/// Check `timestamp` against an explicit `now`; both bounds are inclusive
pub fn validate_timestamp_at(
    timestamp: i64,
    now: i64,
    window: &TimestampWindow,
) -> Result<(), ApiAuthError> {
    let age = now - timestamp;

    let reason = if age > window.max_past_ms {
        format!("Timestamp {}ms too old (max {}ms past)", age, window.max_past_ms)
    } else if -age > window.max_future_ms {
        format!(
            "Timestamp {}ms in future (max {}ms future)",
            -age, window.max_future_ms
        )
    } else {
        return Ok(());
    };

    Err(ApiAuthError::InvalidTimestamp {
        timestamp,
        now,
        reason,
    })
}

// ========================================
// Hashing
// ========================================

/// SHA-256 signature of a request object, as 64 lowercase hex characters
///
/// Any `hash` already present is replaced by [`DUMMY_HASH`] first, so a
/// signed and an unsigned copy of the same request hash identically.
///
/// ```
/// use dayfeed_common::api::auth::calculate_hash;
/// use serde_json::json;
///
/// let request = json!({"clientId": "mom", "timestamp": 1757404800000i64});
/// assert_eq!(calculate_hash(&request, 123456789).len(), 64);
/// ```
pub fn calculate_hash(json_value: &Value, shared_secret: i64) -> String {
    let mut value = json_value.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }

    let mut input = to_canonical_json(&value);
    let _ = write!(input, "{}", shared_secret);

    let digest = Sha256::digest(input.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut hex, byte| {
        let _ = write!(hex, "{:02x}", byte);
        hex
    })
}

/// Compact JSON with object keys in sorted order
///
/// ```
/// use dayfeed_common::api::auth::to_canonical_json;
/// use serde_json::json;
///
/// let json = json!({"z": 3, "a": 1, "m": 2});
/// assert_eq!(to_canonical_json(&json), r#"{"a":1,"m":2,"z":3}"#);
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(key);
                out.push_str("\":");
                write_canonical(out, &map[key.as_str()]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::String(text) => {
            out.push('"');
            for c in text.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Value::Null => out.push_str("null"),
    }
}

/// Compare a provided hash with the one computed for `json_value`
pub fn validate_hash(
    provided_hash: &str,
    json_value: &Value,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = calculate_hash(json_value, shared_secret);
    if provided_hash == calculated {
        return Ok(());
    }
    Err(ApiAuthError::InvalidHash {
        provided: provided_hash.to_string(),
        calculated,
    })
}

// ========================================
// Request helpers
// ========================================

/// Build the hashable JSON object for GET query parameters
///
/// A `timestamp` that does not parse as an integer stays a string and
/// fails field extraction later.
pub fn query_params_to_json<'a, I>(params: I) -> Value
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let map: Map<String, Value> = params
        .into_iter()
        .map(|(key, raw)| {
            let value = match (key, raw.parse::<i64>()) {
                ("timestamp", Ok(millis)) => Value::from(millis),
                _ => Value::String(raw.to_string()),
            };
            (key.to_string(), value)
        })
        .collect();
    Value::Object(map)
}

/// Pull `timestamp` and `hash` out of a request object
pub fn extract_auth_fields(value: &Value) -> Result<(i64, String), ApiAuthError> {
    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_i64)
        .ok_or(ApiAuthError::MissingTimestamp)?;
    let hash = value
        .get("hash")
        .and_then(Value::as_str)
        .ok_or(ApiAuthError::MissingHash)?;
    Ok((timestamp, hash.to_string()))
}

/// Fill in the `hash` field of a request object
///
/// With `shared_secret == 0` the value is left untouched.
pub fn sign_value(value: &mut Value, shared_secret: i64) {
    if shared_secret == 0 {
        return;
    }
    let hash = calculate_hash(value, shared_secret);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(hash));
    }
}

// ========================================
// Tests
// ========================================
