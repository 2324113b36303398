//! OpenWeatherMap-compatible weather provider client

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use dayfeed_common::{Error, Result, WeatherObservation};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::WeatherProvider;

const USER_AGENT: &str = concat!("dayfeed/", env!("CARGO_PKG_VERSION"));

/// `GET {base_url}/weather` response
///
/// Accepts both the OpenWeatherMap current-weather document and the flat
/// shape served by the household's own proxy.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WeatherPayload {
    OpenWeather(OwmResponse),
    Flat(FlatResponse),
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    /// Observation time, Unix seconds
    #[serde(default)]
    dt: Option<i64>,
    /// Location's UTC offset in seconds
    #[serde(default)]
    timezone: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatResponse {
    temp: f64,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    condition_code: String,
    #[serde(default)]
    description: String,
}

impl WeatherPayload {
    fn into_observation(self, now: DateTime<Utc>) -> WeatherObservation {
        match self {
            WeatherPayload::OpenWeather(owm) => {
                let observed_at = owm
                    .dt
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .unwrap_or(now);
                let local = observed_at + ChronoDuration::seconds(owm.timezone.unwrap_or(0));
                let condition = owm.weather.into_iter().next();

                WeatherObservation {
                    temperature_c: owm.main.temp,
                    wind_speed_ms: owm.wind.map(|w| w.speed).unwrap_or(0.0),
                    condition_code: condition.as_ref().map(|c| c.main.clone()).unwrap_or_default(),
                    description: condition.map(|c| c.description).unwrap_or_default(),
                    month: local.month(),
                }
            }
            // No observation time in the flat shape; the service restates
            // the month in the client's zone before classifying
            WeatherPayload::Flat(flat) => WeatherObservation {
                temperature_c: flat.temp,
                wind_speed_ms: flat.wind_speed,
                condition_code: flat.condition_code,
                description: flat.description,
                month: now.month(),
            },
        }
    }
}

/// Current-weather client
pub struct OpenWeatherClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        language: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn name(&self) -> &'static str {
        "openweather"
    }

    async fn observe(&self, location: &str) -> Result<WeatherObservation> {
        let mut params = vec![
            ("q", location),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ];
        if let Some(lang) = &self.language {
            params.push(("lang", lang.as_str()));
        }

        debug!(location = %location, "Querying weather provider");

        let response = self
            .http_client
            .get(format!("{}/weather", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::TransientTransport(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(Error::AuthFailure("Weather provider rejected API key".to_string()));
        }

        if status.is_server_error() || status == 429 {
            return Err(Error::TransientTransport(format!(
                "Weather provider returned {}",
                status
            )));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::DataInvalid(format!(
                "Weather provider returned {}: {}",
                status, error_text
            )));
        }

        let payload: WeatherPayload = response
            .json()
            .await
            .map_err(|e| Error::DataInvalid(format!("Weather payload parse failed: {}", e)))?;

        Ok(payload.into_observation(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_openweather_document_normalized() {
        // 2025-03-31 22:30 UTC is already April in Helsinki (UTC+3)
        let body = r#"{
            "main": {"temp": 4.2, "feels_like": 1.0},
            "wind": {"speed": 5.5},
            "weather": [{"main": "Rain", "description": "kevyt sade"}],
            "dt": 1743460200,
            "timezone": 10800
        }"#;

        let payload: WeatherPayload = serde_json::from_str(body).unwrap();
        let obs = payload.into_observation(Utc::now());

        assert_eq!(obs.temperature_c, 4.2);
        assert_eq!(obs.wind_speed_ms, 5.5);
        assert_eq!(obs.condition_code, "Rain");
        assert_eq!(obs.description, "kevyt sade");
        assert_eq!(obs.month, 4);
    }

    #[test]
    fn test_flat_document_normalized() {
        let body = r#"{"temp": 18.0, "windSpeed": 2.0, "conditionCode": "Clear", "description": "selkeää"}"#;
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();

        let payload: WeatherPayload = serde_json::from_str(body).unwrap();
        let obs = payload.into_observation(now);

        assert_eq!(obs.temperature_c, 18.0);
        assert_eq!(obs.condition_code, "Clear");
        assert_eq!(obs.month, 7);
    }

    #[test]
    fn test_missing_wind_and_conditions_default() {
        let body = r#"{"main": {"temp": 10.0}}"#;
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();

        let payload: WeatherPayload = serde_json::from_str(body).unwrap();
        let obs = payload.into_observation(now);

        assert_eq!(obs.wind_speed_ms, 0.0);
        assert!(obs.condition_code.is_empty());
        assert_eq!(obs.month, 1);
    }
}
