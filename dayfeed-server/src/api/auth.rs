//! Authentication middleware
//!
//! Protected routes carry `timestamp` and `hash`: POST requests in the
//! JSON body, GET requests as query parameters. The hash covers every
//! other field, so a captured request cannot be replayed with different
//! parameters or after the timestamp window closes.

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dayfeed_common::api::{
    extract_auth_fields, query_params_to_json, validate_hash, validate_timestamp, ApiAuthError,
    AuthErrorResponse,
};
use serde_json::Value;
use tracing::warn;

use crate::AppState;

/// Upper bound on request bodies read for hashing
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Authentication middleware
///
/// Applied to protected routes only; `/health` is public.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // secret = 0 disables all auth checking
    if state.shared_secret == 0 {
        return Ok(next.run(request).await);
    }

    if request.method() == Method::GET {
        let Query(params): Query<Vec<(String, String)>> = Query::try_from_uri(request.uri())
            .map_err(|e| AuthError::ParseError(format!("Invalid query string: {}", e)))?;
        let value =
            query_params_to_json(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        verify(&state, &value)?;
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AuthError::ParseError(format!("Failed to read body: {}", e)))?;

    let json_value: Value = serde_json::from_slice(&body_bytes)
        .map_err(|e| AuthError::ParseError(format!("Invalid JSON: {}", e)))?;

    verify(&state, &json_value)?;

    // Reconstruct request with restored body for downstream handlers
    let request = Request::from_parts(parts, Body::from(body_bytes));
    Ok(next.run(request).await)
}

fn verify(state: &AppState, value: &Value) -> Result<(), AuthError> {
    let (timestamp, hash) = extract_auth_fields(value).map_err(AuthError::from)?;

    validate_timestamp(timestamp, &state.auth_window).map_err(AuthError::from)?;

    validate_hash(&hash, value, state.shared_secret).map_err(|e| {
        if let ApiAuthError::InvalidHash { provided, calculated } = &e {
            warn!(
                "Hash validation failed: provided={}, calculated={}",
                provided, calculated
            );
        }
        AuthError::from(e)
    })
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    InvalidTimestamp(String),
    InvalidHash,
    MissingFields(String),
    ParseError(String),
}

impl From<ApiAuthError> for AuthError {
    fn from(err: ApiAuthError) -> Self {
        match err {
            ApiAuthError::InvalidTimestamp { reason, .. } => AuthError::InvalidTimestamp(reason),
            ApiAuthError::InvalidHash { .. } => AuthError::InvalidHash,
            ApiAuthError::MissingTimestamp | ApiAuthError::MissingHash => {
                AuthError::MissingFields(err.to_string())
            }
            ApiAuthError::ParseError(msg) => AuthError::ParseError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::InvalidTimestamp(reason) => (
                StatusCode::UNAUTHORIZED,
                AuthErrorResponse::new("timestamp_invalid", reason),
            ),
            AuthError::InvalidHash => (
                StatusCode::UNAUTHORIZED,
                AuthErrorResponse::new("hash_invalid", "Invalid hash"),
            ),
            AuthError::MissingFields(msg) => (
                StatusCode::UNAUTHORIZED,
                AuthErrorResponse::new("auth_missing", msg),
            ),
            AuthError::ParseError(msg) => (
                StatusCode::BAD_REQUEST,
                AuthErrorResponse::new("parse_error", msg),
            ),
        };

        (status, Json(body)).into_response()
    }
}
