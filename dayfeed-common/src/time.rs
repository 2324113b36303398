//! Timestamp and local-time utilities

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Parse an IANA timezone name such as `Europe/Helsinki`
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::Config(format!("Unknown timezone: {}", name)))
}

/// Local calendar date of `at` in `tz`
pub fn local_date(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Part of the day a request falls in
///
/// Serialized with the household's Finnish slot labels, which are also the
/// `timeSlot` values clients send when acknowledging tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    /// 22:00 - 05:59
    #[serde(rename = "Yö", alias = "Night")]
    Night,
    /// 06:00 - 10:59
    #[serde(rename = "Aamu", alias = "Morning")]
    Morning,
    /// 11:00 - 16:59
    #[serde(rename = "Päivä", alias = "Midday")]
    Midday,
    /// 17:00 - 21:59
    #[serde(rename = "Ilta", alias = "Evening")]
    Evening,
}

impl TimeOfDay {
    /// Bucket for a local hour (0-23)
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=10 => TimeOfDay::Morning,
            11..=16 => TimeOfDay::Midday,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    /// Bucket for `at` in the client's timezone
    pub fn at(at: DateTime<Utc>, tz: Tz) -> Self {
        Self::from_hour(at.with_timezone(&tz).hour())
    }

    /// Slot label used on the wire and in the ledger
    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Night => "Yö",
            TimeOfDay::Morning => "Aamu",
            TimeOfDay::Midday => "Päivä",
            TimeOfDay::Evening => "Ilta",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yö" | "night" => Ok(TimeOfDay::Night),
            "aamu" | "morning" => Ok(TimeOfDay::Morning),
            "päivä" | "midday" => Ok(TimeOfDay::Midday),
            "ilta" | "evening" => Ok(TimeOfDay::Evening),
            other => Err(Error::InvalidInput(format!("Unknown time slot: {}", other))),
        }
    }
}
