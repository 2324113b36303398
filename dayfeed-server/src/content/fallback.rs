//! Fallback content store: JSON export of the legacy spreadsheet
//!
//! The export is a web app answering `GET {url}?clientId=..&category=..`
//! with an array of rows (or `{"data": [...]}`). Rows were written by hand
//! over the years, so the URL/text column goes by several names. This
//! adapter reduces every row to a [`ContentItem`] tagged `Fallback`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dayfeed_common::{Error, Result, TimeOfDay};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Category, ContentItem, ContentStore, SourceTier, WeatherAffinity};

const USER_AGENT: &str = concat!("dayfeed/", env!("CARGO_PKG_VERSION"));

/// Column names that may hold the item payload, in priority order
const PAYLOAD_KEYS: &[&str] = &["url", "photoUrl", "imageUrl", "payload", "text"];

/// HTTP client for the spreadsheet export
pub struct SpreadsheetContentStore {
    http_client: reqwest::Client,
    url: String,
}

impl SpreadsheetContentStore {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ContentStore for SpreadsheetContentStore {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    async fn fetch(&self, client_id: &str, category: Category) -> Result<Vec<ContentItem>> {
        debug!(client_id = %client_id, category = %category, "Querying spreadsheet export");

        let response = self
            .http_client
            .get(&self.url)
            .query(&[("clientId", client_id), ("category", category.as_str())])
            .send()
            .await
            .map_err(|e| Error::TransientTransport(e.to_string()))?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(Error::AuthFailure(format!(
                "Spreadsheet export rejected request ({})",
                status
            )));
        }

        if status.is_server_error() {
            return Err(Error::TransientTransport(format!(
                "Spreadsheet export returned {}",
                status
            )));
        }

        if !status.is_success() {
            return Err(Error::DataInvalid(format!(
                "Spreadsheet export returned {}",
                status
            )));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);
        if is_html {
            return Err(Error::DataInvalid(
                "Spreadsheet export returned HTML instead of JSON".to_string(),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::DataInvalid(format!("Spreadsheet export parse failed: {}", e)))?;

        rows_to_items(body, client_id, category)
    }
}

/// Normalize an export body into content items
///
/// Rows without a payload, or belonging to another category, are skipped.
pub fn rows_to_items(body: Value, client_id: &str, category: Category) -> Result<Vec<ContentItem>> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(Error::DataInvalid(
                    "Spreadsheet export object has no data array".to_string(),
                ))
            }
        },
        _ => {
            return Err(Error::DataInvalid(
                "Spreadsheet export is not a list of rows".to_string(),
            ))
        }
    };

    let mut items = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let Value::Object(row) = row else {
            warn!(row = index, "Skipping non-object spreadsheet row");
            continue;
        };

        if let Some(row_category) = text_field(&row, &["category"]) {
            match row_category.parse::<Category>() {
                Ok(c) if c == category => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(row = index, "Skipping spreadsheet row: {}", e);
                    continue;
                }
            }
        }

        let Some(payload) = text_field(&row, PAYLOAD_KEYS) else {
            debug!(row = index, "Skipping spreadsheet row without payload");
            continue;
        };

        let weather_affinity = match text_field(&row, &["weatherAffinity", "weather"]) {
            Some(raw) => match WeatherAffinity::parse_lenient(&raw) {
                Ok(a) => a,
                Err(e) => {
                    warn!(row = index, "Skipping spreadsheet row: {}", e);
                    continue;
                }
            },
            None => WeatherAffinity::Any,
        };

        let time_of_day = text_field(&row, &["timeOfDay", "timeSlot"])
            .and_then(|raw| raw.parse::<TimeOfDay>().ok());

        let created_at = text_field(&row, &["createdAt", "timestamp"])
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let row_client = text_field(&row, &["clientId", "client"]).unwrap_or_else(|| client_id.to_string());
        let id = text_field(&row, &["id"])
            .unwrap_or_else(|| format!("sheet:{}:{}:{}", row_client, category, index));

        items.push(ContentItem {
            id,
            client_id: row_client,
            category,
            payload,
            caption: text_field(&row, &["caption", "description"]).unwrap_or_default(),
            created_at,
            source_tier: SourceTier::Fallback,
            weather_affinity,
            time_of_day,
        });
    }

    Ok(items)
}

/// First non-empty string (or number) under any of `keys`
fn text_field(row: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
