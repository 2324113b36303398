//! POST /feed/acknowledge
//!
//! Replies with `{status, alreadyAcked}` in every case so the tablet can
//! show a retry prompt. A ledger failure is reported as `ERROR` with 503,
//! never as a success.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use dayfeed_common::api::{AcknowledgeRequest, AcknowledgeResponse};
use dayfeed_common::Error;
use tracing::warn;

use crate::AppState;

pub async fn acknowledge(
    State(state): State<AppState>,
    payload: Result<Json<AcknowledgeRequest>, JsonRejection>,
) -> (StatusCode, Json<AcknowledgeResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AcknowledgeResponse::error(rejection.body_text())),
            )
        }
    };

    match state.assembler.acknowledge(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(Error::InvalidInput(msg)) => {
            (StatusCode::BAD_REQUEST, Json(AcknowledgeResponse::error(msg)))
        }
        Err(e) => {
            warn!(
                client_id = %request.client_id,
                task_type = %request.task_type,
                "Acknowledgment not recorded: {}",
                e
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(AcknowledgeResponse::error(
                    "Acknowledgment could not be saved, please try again",
                )),
            )
        }
    }
}
