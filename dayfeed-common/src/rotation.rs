//! Deterministic content rotation
//!
//! Maps a seed string and a pool size to a stable index. The seed combines
//! the client id with a period key, so every poll inside the same period
//! lands on the same item without any stored cursor, and the item changes
//! when the period rolls over.
//!
//! # Algorithm
//!
//! 1. Sum the seed's UTF-16 code units
//! 2. `x = sin(sum) * 10000`, keep the fractional part → value in [0, 1)
//! 3. `index = floor(value * pool_size)`
//!
//! Summing UTF-16 units (not bytes, not `char`s) keeps the result identical
//! to implementations that iterate `charCodeAt` over the same string.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How long one selection stays stable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationPeriod {
    /// New item every local calendar day
    #[default]
    Daily,
    /// New item every ISO week (anchored on Monday)
    Weekly,
}

impl RotationPeriod {
    /// Period key for `date`
    ///
    /// Daily: `2025_9_9`. Weekly: `week_2025_9_8` (the Monday of that week).
    /// Month and day are 1-based and unpadded.
    pub fn period_key(&self, date: NaiveDate) -> String {
        match self {
            RotationPeriod::Daily => {
                format!("{}_{}_{}", date.year(), date.month(), date.day())
            }
            RotationPeriod::Weekly => {
                let monday = week_start(date);
                format!("week_{}_{}_{}", monday.year(), monday.month(), monday.day())
            }
        }
    }

    /// Full rotation seed for a client on `date`
    pub fn seed(&self, client_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", client_id, self.period_key(date))
    }
}

impl std::str::FromStr for RotationPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(RotationPeriod::Daily),
            "weekly" | "week" => Ok(RotationPeriod::Weekly),
            other => Err(Error::InvalidInput(format!(
                "Unknown rotation period '{}' (expected daily or weekly)",
                other
            ))),
        }
    }
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Deterministic pseudo-random value in [0, 1) for `seed`
pub fn seed_value(seed: &str) -> f64 {
    let sum: u64 = seed.encode_utf16().map(u64::from).sum();
    let x = (sum as f64).sin() * 10000.0;
    x - x.floor()
}

/// Select an index in `0..pool_size` for `seed`
///
/// Returns `Error::EmptyPool` when `pool_size == 0`.
pub fn select(seed: &str, pool_size: usize) -> Result<usize> {
    if pool_size == 0 {
        return Err(Error::EmptyPool);
    }

    let index = (seed_value(seed) * pool_size as f64).floor() as usize;

    // Guards the value * size == size edge that float rounding can produce
    Ok(index.min(pool_size - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_seed_same_index() {
        let first = select("mom_2025_9_9", 5).unwrap();
        for _ in 0..100 {
            assert_eq!(select("mom_2025_9_9", 5).unwrap(), first);
        }
        assert!(first < 5);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(select("mom_2025_9_9", 0), Err(Error::EmptyPool)));
    }

    #[test]
    fn test_single_item_pool_always_zero() {
        for day in 1..=28 {
            let seed = RotationPeriod::Daily.seed("mom", date(2025, 2, day));
            assert_eq!(select(&seed, 1).unwrap(), 0);
        }
    }

    #[test]
    fn test_seed_value_in_unit_interval() {
        for seed in ["", "a", "mom_2025_9_9", "äiti_2025_12_31", "🌦️"] {
            let v = seed_value(seed);
            assert!((0.0..1.0).contains(&v), "{} -> {}", seed, v);
        }
    }

    #[test]
    fn test_seed_value_matches_reference_arithmetic() {
        // "ab" = 97 + 98 = 195
        let x = 195f64.sin() * 10000.0;
        assert_eq!(seed_value("ab"), x - x.floor());
    }

    #[test]
    fn test_utf16_code_units_are_summed() {
        // U+1F326 is a surrogate pair in UTF-16: 0xD83C + 0xDF26
        let expected_sum = 0xD83Cu64 + 0xDF26u64;
        let x = (expected_sum as f64).sin() * 10000.0;
        assert_eq!(seed_value("\u{1F326}"), x - x.floor());
    }

    #[test]
    fn test_daily_seed_format() {
        let seed = RotationPeriod::Daily.seed("mom", date(2025, 9, 9));
        assert_eq!(seed, "mom_2025_9_9");
    }

    #[test]
    fn test_weekly_seed_anchored_on_monday() {
        // 2025-09-08 is a Monday
        let monday = RotationPeriod::Weekly.seed("mom", date(2025, 9, 8));
        let sunday = RotationPeriod::Weekly.seed("mom", date(2025, 9, 14));
        let next_monday = RotationPeriod::Weekly.seed("mom", date(2025, 9, 15));

        assert_eq!(monday, "mom_week_2025_9_8");
        assert_eq!(monday, sunday);
        assert_ne!(monday, next_monday);
    }

    #[test]
    fn test_week_start_crosses_year_boundary() {
        // 2026-01-01 is a Thursday; its week starts 2025-12-29
        assert_eq!(week_start(date(2026, 1, 1)), date(2025, 12, 29));
    }

    #[test]
    fn test_rotation_changes_across_days() {
        // Over a month of daily seeds a 7-item pool should not be stuck on one index
        let mut seen = std::collections::HashSet::new();
        for day in 1..=30 {
            let seed = RotationPeriod::Daily.seed("mom", date(2025, 9, day));
            seen.insert(select(&seed, 7).unwrap());
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("daily".parse::<RotationPeriod>().unwrap(), RotationPeriod::Daily);
        assert_eq!("Weekly".parse::<RotationPeriod>().unwrap(), RotationPeriod::Weekly);
        assert!("hourly".parse::<RotationPeriod>().is_err());
    }
}
