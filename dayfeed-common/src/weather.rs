//! Weather classification
//!
//! Turns a raw observation into the three booleans the feed conditions on.
//! Pure functions only; fetching lives in the server's provider module.

use serde::{Deserialize, Serialize};

/// Wind-chill only applies below this temperature (°C)
const WIND_CHILL_MAX_TEMP_C: f64 = 10.0;
/// Wind-chill only applies above this wind speed (km/h)
const WIND_CHILL_MIN_WIND_KMH: f64 = 4.8;
/// Calm-air allowance subtracted from wind speed before chill (m/s)
const WIND_CHILL_CALM_MS: f64 = 3.0;
/// Degrees of chill per m/s above the calm allowance
const WIND_CHILL_FACTOR: f64 = 1.5;
/// Minimum actual temperature for outdoor suggestions (°C)
const OUTDOOR_MIN_TEMP_C: f64 = 15.0;

/// Substrings marking precipitation in condition codes or descriptions.
/// Includes the Finnish terms the local provider returns with `lang=fi`.
const RAIN_TOKENS: &[&str] = &[
    "rain", "drizzle", "shower", "thunder", "sleet", "sade", "tihku", "ukkonen", "räntä",
];

/// One raw weather reading for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Air temperature in °C
    pub temperature_c: f64,
    /// Wind speed in m/s
    pub wind_speed_ms: f64,
    /// Provider condition group, e.g. "Rain" or "Clouds"
    pub condition_code: String,
    /// Free-text description, e.g. "light rain"
    pub description: String,
    /// Local calendar month (1-12)
    pub month: u32,
}

/// Derived weather conditions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    pub is_raining: bool,
    pub is_cold: bool,
    pub is_good_for_outdoor: bool,
    /// Temperature after wind-chill adjustment
    pub feels_like_c: f64,
}

impl WeatherState {
    /// State used when no provider is configured or reachable
    pub fn neutral() -> Self {
        Self {
            is_raining: false,
            is_cold: false,
            is_good_for_outdoor: false,
            feels_like_c: 0.0,
        }
    }
}

/// Apparent temperature after wind-chill
///
/// Adjusted only when it is below 10 °C and wind exceeds 4.8 km/h.
pub fn feels_like(obs: &WeatherObservation) -> f64 {
    let wind_kmh = obs.wind_speed_ms * 3.6;
    if obs.temperature_c < WIND_CHILL_MAX_TEMP_C && wind_kmh > WIND_CHILL_MIN_WIND_KMH {
        let chill = (obs.wind_speed_ms - WIND_CHILL_CALM_MS).max(0.0) * WIND_CHILL_FACTOR;
        obs.temperature_c - chill
    } else {
        obs.temperature_c
    }
}

/// Seasonal cold threshold for `month` (cold when feels-like is strictly below)
///
/// Months outside 1-12 use the spring/autumn threshold.
pub fn cold_threshold(month: u32) -> f64 {
    match month {
        12 | 1 | 2 => -5.0,
        3..=5 => 5.0,
        6..=8 => 10.0,
        _ => 5.0,
    }
}

/// Whether the condition code or description names precipitation
pub fn is_rain(condition_code: &str, description: &str) -> bool {
    let code = condition_code.to_lowercase();
    let desc = description.to_lowercase();
    RAIN_TOKENS
        .iter()
        .any(|token| code.contains(token) || desc.contains(token))
}

/// Classify an observation
pub fn classify(obs: &WeatherObservation) -> WeatherState {
    let feels_like_c = feels_like(obs);
    let is_cold = feels_like_c < cold_threshold(obs.month);
    let is_raining = is_rain(&obs.condition_code, &obs.description);
    let is_good_for_outdoor = obs.temperature_c >= OUTDOOR_MIN_TEMP_C && !is_raining && !is_cold;

    WeatherState {
        is_raining,
        is_cold,
        is_good_for_outdoor,
        feels_like_c,
    }
}
