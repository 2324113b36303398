//! Content pools
//!
//! A pool is the set of rotation-eligible items (photos, greetings,
//! activity suggestions) for one client and category. Pools come from a
//! primary store, with a legacy fallback store behind it. Every source is
//! normalized to [`ContentItem`] at its boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dayfeed_common::{Error, Result, TimeOfDay, WeatherState};
use serde::{Deserialize, Serialize};

pub mod conditioning;
pub mod fallback;
pub mod primary;
pub mod resolver;
pub mod validity;

pub use conditioning::condition_pool;
pub use fallback::SpreadsheetContentStore;
pub use primary::SqliteContentStore;
pub use resolver::ContentPoolResolver;
pub use validity::{pick_valid, HttpMediaProbe, MediaProbe, TieredProbe, TrustAllProbe};

// ========================================
// Types
// ========================================

/// Content category of the daily feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Photo,
    Greeting,
    Activity,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Photo, Category::Greeting, Category::Activity];

    /// Storage and query-string name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Photo => "photo",
            Category::Greeting => "greeting",
            Category::Activity => "activity",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(Category::Photo),
            "greeting" => Ok(Category::Greeting),
            "activity" => Ok(Category::Activity),
            other => Err(Error::DataInvalid(format!("Unknown category: {}", other))),
        }
    }
}

/// Which store an item was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Primary,
    Fallback,
}

impl SourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::Primary => "primary",
            SourceTier::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for SourceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather an item is suited for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherAffinity {
    #[default]
    Any,
    /// Only when it is good to go outside
    Outdoor,
    /// Only when it is not
    Indoor,
    Rain,
    Cold,
}

impl WeatherAffinity {
    /// Whether an item with this affinity fits `weather`
    pub fn matches(&self, weather: &WeatherState) -> bool {
        match self {
            WeatherAffinity::Any => true,
            WeatherAffinity::Outdoor => weather.is_good_for_outdoor,
            WeatherAffinity::Indoor => !weather.is_good_for_outdoor,
            WeatherAffinity::Rain => weather.is_raining,
            WeatherAffinity::Cold => weather.is_cold,
        }
    }

    /// Parse a stored value; blank means `Any`
    pub fn parse_lenient(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(WeatherAffinity::Any),
            "outdoor" => Ok(WeatherAffinity::Outdoor),
            "indoor" => Ok(WeatherAffinity::Indoor),
            "rain" => Ok(WeatherAffinity::Rain),
            "cold" => Ok(WeatherAffinity::Cold),
            other => Err(Error::DataInvalid(format!("Unknown weather affinity: {}", other))),
        }
    }
}

/// One rotation-eligible item
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub client_id: String,
    pub category: Category,
    /// Photo URL or greeting/activity text
    pub payload: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub source_tier: SourceTier,
    pub weather_affinity: WeatherAffinity,
    /// Restricts a greeting to one part of the day
    pub time_of_day: Option<TimeOfDay>,
}

impl ContentItem {
    /// Unconditioned primary-tier item, mainly for tests and adapters
    pub fn new(
        client_id: impl Into<String>,
        category: Category,
        payload: impl Into<String>,
    ) -> Self {
        let client_id = client_id.into();
        let payload = payload.into();
        Self {
            id: format!("{}:{}:{}", client_id, category, payload),
            client_id,
            category,
            payload,
            caption: String::new(),
            created_at: Utc::now(),
            source_tier: SourceTier::Primary,
            weather_affinity: WeatherAffinity::Any,
            time_of_day: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_affinity(mut self, affinity: WeatherAffinity) -> Self {
        self.weather_affinity = affinity;
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }
}

// ========================================
// Store Trait
// ========================================

/// A source of content pools
///
/// Implementations make a single attempt per call; retrying is left to the
/// caller. A store that has nothing set up for a client should return
/// `Error::ConfigurationMissing` rather than an empty list.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Items for `client_id` in `category`, in curator order
    async fn fetch(&self, client_id: &str, category: Category) -> Result<Vec<ContentItem>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(raining: bool, cold: bool, outdoor: bool) -> WeatherState {
        WeatherState {
            is_raining: raining,
            is_cold: cold,
            is_good_for_outdoor: outdoor,
            feels_like_c: 0.0,
        }
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Photo".parse::<Category>().unwrap(), Category::Photo);
        assert_eq!(" activity ".parse::<Category>().unwrap(), Category::Activity);
        assert!("video".parse::<Category>().is_err());
    }

    #[test]
    fn test_affinity_matches() {
        let sunny = state(false, false, true);
        let rainy = state(true, false, false);
        let freezing = state(false, true, false);

        assert!(WeatherAffinity::Any.matches(&sunny));
        assert!(WeatherAffinity::Any.matches(&rainy));
        assert!(WeatherAffinity::Outdoor.matches(&sunny));
        assert!(!WeatherAffinity::Outdoor.matches(&rainy));
        assert!(WeatherAffinity::Indoor.matches(&rainy));
        assert!(!WeatherAffinity::Indoor.matches(&sunny));
        assert!(WeatherAffinity::Rain.matches(&rainy));
        assert!(!WeatherAffinity::Rain.matches(&freezing));
        assert!(WeatherAffinity::Cold.matches(&freezing));
    }

    #[test]
    fn test_affinity_parse_lenient() {
        assert_eq!(WeatherAffinity::parse_lenient("").unwrap(), WeatherAffinity::Any);
        assert_eq!(
            WeatherAffinity::parse_lenient("OUTDOOR").unwrap(),
            WeatherAffinity::Outdoor
        );
        assert!(WeatherAffinity::parse_lenient("snowstorm").is_err());
    }
}
