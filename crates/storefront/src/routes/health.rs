//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::db;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the commerce backend and, when sessions are persisted, the
/// session database. Returns 503 Service Unavailable if either is down.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if let Err(e) = state.backend().ping().await {
        tracing::warn!(error = %e, "Readiness: commerce backend unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    if let Some(pool) = state.pool()
        && let Err(e) = db::ping(pool).await
    {
        tracing::warn!(error = %e, "Readiness: session database unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}
