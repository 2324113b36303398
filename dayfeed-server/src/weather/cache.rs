//! Weather cache and background refresher
//!
//! The refresher writes here on a fixed cadence; requests only read. A
//! missing or stale entry never blocks a request, it just means the
//! request fetches live or goes neutral.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dayfeed_common::WeatherObservation;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::WeatherService;

/// Last observation per location
#[derive(Debug, Clone)]
pub struct CachedObservation {
    pub observation: WeatherObservation,
    pub fetched_at: DateTime<Utc>,
}

/// Shared location → observation map
#[derive(Debug, Clone, Default)]
pub struct WeatherCache {
    entries: Arc<RwLock<HashMap<String, CachedObservation>>>,
}

impl WeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `location` if it is younger than `max_age` at `now`
    pub async fn get_fresh(
        &self,
        location: &str,
        now: DateTime<Utc>,
        max_age: ChronoDuration,
    ) -> Option<WeatherObservation> {
        let entries = self.entries.read().await;
        let entry = entries.get(location)?;
        if now - entry.fetched_at <= max_age {
            Some(entry.observation.clone())
        } else {
            debug!(location = %location, fetched_at = %entry.fetched_at, "Cached weather is stale");
            None
        }
    }

    pub async fn insert(
        &self,
        location: &str,
        observation: WeatherObservation,
        fetched_at: DateTime<Utc>,
    ) {
        self.entries.write().await.insert(
            location.to_string(),
            CachedObservation {
                observation,
                fetched_at,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Start the periodic refresh of every configured location
///
/// The first refresh runs immediately. The task runs until the runtime
/// shuts down or the handle is aborted.
pub fn spawn_weather_refresher(
    service: Arc<WeatherService>,
    locations: Vec<String>,
    every: Duration,
) -> Option<JoinHandle<()>> {
    if locations.is_empty() || !service.has_provider() {
        info!("Weather refresher not started (no provider or no client locations)");
        return None;
    }

    info!(
        locations = locations.len(),
        interval_secs = every.as_secs(),
        "Starting weather refresher"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let refreshed = service.refresh_all(&locations).await;
            if refreshed < locations.len() {
                warn!(
                    refreshed,
                    total = locations.len(),
                    "Weather refresh incomplete"
                );
            } else {
                debug!(refreshed, "Weather refresh complete");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn obs(temp: f64) -> WeatherObservation {
        WeatherObservation {
            temperature_c: temp,
            wind_speed_ms: 0.0,
            condition_code: "Clear".to_string(),
            description: String::new(),
            month: 6,
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_returned() {
        let cache = WeatherCache::new();
        let fetched = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        cache.insert("Helsinki,FI", obs(18.0), fetched).await;

        let now = fetched + ChronoDuration::hours(2);
        let hit = cache
            .get_fresh("Helsinki,FI", now, ChronoDuration::hours(6))
            .await
            .unwrap();
        assert_eq!(hit.temperature_c, 18.0);
        assert!(cache
            .get_fresh("Tampere,FI", now, ChronoDuration::hours(6))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_ignored() {
        let cache = WeatherCache::new();
        let fetched = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        cache.insert("Helsinki,FI", obs(18.0), fetched).await;

        let now = fetched + ChronoDuration::hours(7);
        assert!(cache
            .get_fresh("Helsinki,FI", now, ChronoDuration::hours(6))
            .await
            .is_none());
        assert_eq!(cache.len().await, 1);
    }
}
