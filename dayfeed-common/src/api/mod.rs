//! API module for shared HTTP API functionality
//!
//! Provides the wire types and request authentication used by both the
//! dayfeed server and the dayfeed client.
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared types
//!
//! The server wraps these with axum middleware; the client signs requests
//! with them before handing them to reqwest.

pub mod auth;
pub mod types;

pub use auth::{
    calculate_hash, extract_auth_fields, query_params_to_json, sign_value, validate_hash,
    validate_timestamp, ApiAuthError, TimestampWindow,
};
pub use types::{
    AckStatus, AcknowledgeRequest, AcknowledgeResponse, AcknowledgmentEntry, AuthErrorResponse,
    DailyPhoto, DailyTask, FeedResponse, WeatherReport, WeatherSource,
};
