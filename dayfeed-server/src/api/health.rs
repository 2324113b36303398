//! Health check endpoint
//!
//! Public liveness probe. Always 200 while the process serves requests;
//! `status` turns `degraded` when the ledger database stops answering,
//! since acknowledgments would then be refused.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Short git hash the binary was built from
    pub build: &'static str,
    pub database: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.assembler.ledger().is_reachable().await;

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        module: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        build: env!("GIT_HASH"),
        database,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
