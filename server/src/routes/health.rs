//! Health check endpoint.

use std::sync::atomic::Ordering;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether state is journaled to PostgreSQL
    pub persistent: bool,
    /// Last journaled change set
    pub journal_seq: i64,
    /// False while writes wait for the journal to come back
    pub writable: bool,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        persistent: state.pool.is_some(),
        journal_seq: state.journal_seq.load(Ordering::Relaxed),
        writable: !state.writes_suspended.load(Ordering::Acquire),
    })
}

/// Root handler.
async fn root() -> &'static str {
    "Grove Server"
}
