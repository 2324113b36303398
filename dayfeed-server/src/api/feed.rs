//! Feed endpoints
//!
//! GET /feed?clientId=..                       full daily payload
//! GET /feed/acknowledgments?clientId=..&date=  the day's confirmations

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use dayfeed_common::api::{AcknowledgmentEntry, FeedResponse};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query of `GET /feed`; `timestamp`/`hash` are consumed by the auth layer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgmentsQuery {
    pub client_id: Option<String>,
    /// YYYY-MM-DD; defaults to the client's today
    pub date: Option<NaiveDate>,
}

fn required_client_id(client_id: Option<String>) -> ApiResult<String> {
    client_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("clientId query parameter is required".to_string()))
}

/// GET /feed
///
/// Always 200 for a valid request; missing content degrades to defaults.
pub async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let client_id = required_client_id(query.client_id)?;
    let feed = state.assembler.assemble(&client_id).await?;
    Ok(Json(feed))
}

/// GET /feed/acknowledgments
pub async fn get_acknowledgments(
    State(state): State<AppState>,
    Query(query): Query<AcknowledgmentsQuery>,
) -> ApiResult<Json<Vec<AcknowledgmentEntry>>> {
    let client_id = required_client_id(query.client_id)?;
    let entries = state
        .assembler
        .acknowledgments(&client_id, query.date)
        .await?;
    Ok(Json(entries))
}
