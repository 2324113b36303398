//! Weather for the feed
//!
//! Order of preference per request: a fresh cache entry written by the
//! background refresher, then a live provider call bounded by a timeout,
//! then a neutral placeholder. The feed never waits longer than that
//! timeout for weather and never fails because of it.
//!
//! Observations are classified against the client's local calendar month
//! at request time, whatever month the provider or the cache reported.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use dayfeed_common::api::{WeatherReport, WeatherSource};
use dayfeed_common::time::local_date;
use dayfeed_common::{classify, Error, Result, WeatherObservation, WeatherState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod cache;
pub mod provider;

pub use cache::{spawn_weather_refresher, WeatherCache};
pub use provider::OpenWeatherClient;

/// Current-weather source for a location
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// One observation for `location` (single attempt)
    async fn observe(&self, location: &str) -> Result<WeatherObservation>;
}

/// Classified weather plus the block shown in the feed
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub state: WeatherState,
    pub report: WeatherReport,
}

impl WeatherSnapshot {
    pub fn from_observation(obs: &WeatherObservation, source: WeatherSource) -> Self {
        let state = classify(obs);
        Self {
            state,
            report: WeatherReport {
                temperature_c: Some(obs.temperature_c),
                feels_like_c: Some(state.feels_like_c),
                description: obs.description.clone(),
                is_raining: state.is_raining,
                is_cold: state.is_cold,
                is_good_for_outdoor: state.is_good_for_outdoor,
                source,
            },
        }
    }

    /// Placeholder used when there is no usable observation
    pub fn neutral() -> Self {
        let state = WeatherState::neutral();
        Self {
            state,
            report: WeatherReport {
                temperature_c: None,
                feels_like_c: None,
                description: String::new(),
                is_raining: state.is_raining,
                is_cold: state.is_cold,
                is_good_for_outdoor: state.is_good_for_outdoor,
                source: WeatherSource::Fallback,
            },
        }
    }
}

pub struct WeatherService {
    provider: Option<Arc<dyn WeatherProvider>>,
    cache: WeatherCache,
    timeout: Duration,
    max_age: ChronoDuration,
}

impl WeatherService {
    pub fn new(
        provider: Option<Arc<dyn WeatherProvider>>,
        cache: WeatherCache,
        timeout: Duration,
        max_age: Duration,
    ) -> Self {
        let max_age = ChronoDuration::from_std(max_age).unwrap_or_else(|_| ChronoDuration::hours(6));
        Self {
            provider,
            cache,
            timeout,
            max_age,
        }
    }

    /// Service without a provider; every request gets neutral weather
    pub fn disabled() -> Self {
        Self::new(
            None,
            WeatherCache::new(),
            Duration::from_secs(5),
            Duration::from_secs(6 * 3600),
        )
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Weather for `location` at `now`, seasoned for a client in `tz`
    pub async fn current(
        &self,
        location: Option<&str>,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> WeatherSnapshot {
        let Some(location) = location else {
            debug!("No location configured, using neutral weather");
            return WeatherSnapshot::neutral();
        };
        let month = local_date(now, tz).month();

        if let Some(mut obs) = self.cache.get_fresh(location, now, self.max_age).await {
            obs.month = month;
            return WeatherSnapshot::from_observation(&obs, WeatherSource::Cached);
        }

        match self.fetch_live(location).await {
            Ok(mut obs) => {
                self.cache.insert(location, obs.clone(), now).await;
                obs.month = month;
                WeatherSnapshot::from_observation(&obs, WeatherSource::Live)
            }
            Err(Error::ConfigurationMissing(_)) => WeatherSnapshot::neutral(),
            Err(e) => {
                warn!(location = %location, "Weather unavailable, using neutral weather: {}", e);
                WeatherSnapshot::neutral()
            }
        }
    }

    /// Fetch every location into the cache; returns how many succeeded
    pub async fn refresh_all(&self, locations: &[String]) -> usize {
        let mut refreshed = 0;
        for location in locations {
            match self.fetch_live(location).await {
                Ok(obs) => {
                    info!(
                        location = %location,
                        temperature_c = obs.temperature_c,
                        condition = %obs.condition_code,
                        "Weather refreshed"
                    );
                    self.cache.insert(location, obs, Utc::now()).await;
                    refreshed += 1;
                }
                Err(e) => warn!(location = %location, "Weather refresh failed: {}", e),
            }
        }
        refreshed
    }

    async fn fetch_live(&self, location: &str) -> Result<WeatherObservation> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| Error::ConfigurationMissing("No weather provider".to_string()))?;

        match tokio::time::timeout(self.timeout, provider.observe(location)).await {
            Ok(result) => result,
            Err(_) => Err(Error::TransientTransport(format!(
                "{} did not answer within {:?}",
                provider.name(),
                self.timeout
            ))),
        }
    }
}
