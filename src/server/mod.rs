//! HTTP server for the GitHub App.
//!
//! This module implements the HTTP server that:
//! - Accepts webhooks from GitHub, validates signatures, and queues them for
//!   the dispatcher
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /` - Accepts GitHub webhook deliveries (returns 200 once queued)
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::webhooks::DispatchQueue;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{WebhookError, webhook_handler};

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,

    /// Where verified deliveries go.
    queue: DispatchQueue,
}

impl AppState {
    pub fn new(webhook_secret: impl Into<Vec<u8>>, queue: DispatchQueue) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                queue,
            }),
        }
    }

    /// Returns the webhook secret.
    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.inner.queue
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", post(webhook_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serves the app on `listener` until `shutdown` is cancelled.
///
/// In-flight requests are allowed to complete.
pub async fn serve(
    listener: TcpListener,
    app_state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| Error::internal("Failed to read listener address").with_source(e))?;
    info!(%addr, "Listening");

    axum::serve(listener, build_router(app_state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::internal("HTTP server failed").with_source(e))?;

    info!("HTTP server stopped");
    Ok(())
}
