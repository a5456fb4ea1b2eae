//! Liveness probe.

use axum::http::StatusCode;

/// `GET /health`: 200 with body `OK` while the process is serving.
///
/// Does not check GitHub reachability or the dispatcher; a stopped
/// dispatcher shows up as 500s on `POST /` instead.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
