//! Weather and time-of-day narrowing of greeting/activity pools

use dayfeed_common::{TimeOfDay, WeatherState};
use tracing::debug;

use super::{Category, ContentItem};

/// Narrow `pool` to items that suit the current weather and part of day
///
/// Photos are never narrowed. When no item survives, the unconditioned
/// pool is returned so the category still has something to rotate over.
pub fn condition_pool(
    pool: Vec<ContentItem>,
    category: Category,
    weather: &WeatherState,
    time_of_day: TimeOfDay,
) -> Vec<ContentItem> {
    if category == Category::Photo || pool.is_empty() {
        return pool;
    }

    let narrowed: Vec<ContentItem> = pool
        .iter()
        .filter(|item| item.weather_affinity.matches(weather))
        .filter(|item| item.time_of_day.map_or(true, |slot| slot == time_of_day))
        .cloned()
        .collect();

    if narrowed.is_empty() {
        debug!(
            category = %category,
            pool_size = pool.len(),
            "No item matches current conditions, using full pool"
        );
        return pool;
    }

    narrowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::WeatherAffinity;

    fn sunny() -> WeatherState {
        WeatherState {
            is_raining: false,
            is_cold: false,
            is_good_for_outdoor: true,
            feels_like_c: 20.0,
        }
    }

    fn rainy() -> WeatherState {
        WeatherState {
            is_raining: true,
            is_cold: false,
            is_good_for_outdoor: false,
            feels_like_c: 12.0,
        }
    }

    fn activities() -> Vec<ContentItem> {
        vec![
            ContentItem::new("mom", Category::Activity, "Kävely puistossa")
                .with_affinity(WeatherAffinity::Outdoor),
            ContentItem::new("mom", Category::Activity, "Ristikko")
                .with_affinity(WeatherAffinity::Indoor),
            ContentItem::new("mom", Category::Activity, "Radio"),
        ]
    }

    fn payloads(pool: &[ContentItem]) -> Vec<&str> {
        pool.iter().map(|i| i.payload.as_str()).collect()
    }

    #[test]
    fn test_outdoor_weather_keeps_outdoor_and_any() {
        let pool = condition_pool(activities(), Category::Activity, &sunny(), TimeOfDay::Midday);
        assert_eq!(payloads(&pool), vec!["Kävely puistossa", "Radio"]);
    }

    #[test]
    fn test_rain_keeps_indoor_and_any() {
        let pool = condition_pool(activities(), Category::Activity, &rainy(), TimeOfDay::Midday);
        assert_eq!(payloads(&pool), vec!["Ristikko", "Radio"]);
    }

    #[test]
    fn test_greeting_time_of_day_restriction() {
        let greetings = vec![
            ContentItem::new("mom", Category::Greeting, "Huomenta!").with_time_of_day(TimeOfDay::Morning),
            ContentItem::new("mom", Category::Greeting, "Hyvää iltaa!").with_time_of_day(TimeOfDay::Evening),
            ContentItem::new("mom", Category::Greeting, "Hei!"),
        ];

        let pool = condition_pool(greetings, Category::Greeting, &sunny(), TimeOfDay::Evening);
        assert_eq!(payloads(&pool), vec!["Hyvää iltaa!", "Hei!"]);
    }

    #[test]
    fn test_empty_narrowing_returns_full_pool() {
        let pool = vec![
            ContentItem::new("mom", Category::Activity, "Lumityöt").with_affinity(WeatherAffinity::Cold),
        ];
        let conditioned = condition_pool(pool.clone(), Category::Activity, &sunny(), TimeOfDay::Morning);
        assert_eq!(conditioned, pool);
    }

    #[test]
    fn test_photos_untouched() {
        let pool = vec![
            ContentItem::new("mom", Category::Photo, "https://x/a.jpg").with_affinity(WeatherAffinity::Rain),
            ContentItem::new("mom", Category::Photo, "https://x/b.jpg"),
        ];
        let conditioned = condition_pool(pool.clone(), Category::Photo, &sunny(), TimeOfDay::Morning);
        assert_eq!(conditioned, pool);
    }
}
