//! Liveness and readiness checks.

use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::error::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Pong {
    message: &'static str,
    status: &'static str,
}

/// Liveness check in the response envelope.
pub async fn ping() -> ApiResponse<Pong> {
    ApiResponse::ok(Pong {
        message: "pong",
        status: "ok",
    })
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
