//! # Dayfeed Common Library
//!
//! Shared code for the dayfeed server and client:
//! - Error taxonomy (`Error` enum)
//! - Configuration loading and root folder resolution
//! - API wire types and request authentication
//! - Deterministic content rotation
//! - Weather classification
//! - Time-of-day buckets and rotation period keys
//! - Database initialization (behind the `sqlx` feature)

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod rotation;
pub mod time;
pub mod weather;

pub use error::{Error, Result};
pub use rotation::{select, RotationPeriod};
pub use time::TimeOfDay;
pub use weather::{classify, WeatherObservation, WeatherState};
