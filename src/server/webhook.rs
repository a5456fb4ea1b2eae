//! Webhook endpoint handler.
//!
//! Verifies the delivery signature over the raw body, parses the payload,
//! and queues it for the dispatcher before answering 200. Handler outcomes
//! never affect the response.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::error::{self, Error};
use crate::webhooks::{WebhookDelivery, verify_signature};

/// Header name for GitHub event type.
pub const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
pub const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
pub const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Body of the acknowledgement sent to GitHub.
pub const ACK_BODY: &str = "Webhook received";

/// Errors that can occur when accepting a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header absent or not a string.
    #[error("Missing X-Hub-Signature-256 header")]
    MissingSignature,

    /// Signature present but not matching the body.
    #[error("invalid signature")]
    InvalidSignature,

    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Anything unanticipated; details stay in the logs.
    #[error(transparent)]
    Internal(#[from] Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookError::MissingSignature => (StatusCode::BAD_REQUEST, self.to_string()),
            WebhookError::InvalidSignature => (StatusCode::UNAUTHORIZED, self.to_string()),
            WebhookError::MissingHeader(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            WebhookError::InvalidJson(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            WebhookError::Internal(e) => {
                error::report(e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the body
///   - `X-GitHub-Event`: Event type (e.g., "ping", "installation")
///   - `X-GitHub-Delivery`: Unique delivery ID
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 200 OK: Delivery verified, parsed and queued
/// - 400 Bad Request: Missing header or invalid JSON
/// - 401 Unauthorized: Signature does not match
/// - 500 Internal Server Error: Dispatcher not running
///
/// # Example
///
/// ```ignore
/// POST / HTTP/1.1
/// X-GitHub-Event: ping
/// X-GitHub-Delivery: 72d3162e-cc78-11e3-81ab-4c9367dc0958
/// X-Hub-Signature-256: sha256=...
/// Content-Type: application/json
///
/// {"zen": "Keep it logically awesome.", "hook_id": 123}
///
/// HTTP/1.1 200 OK
///
/// Webhook received
/// ```
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    // Verify BEFORE any parsing: the signature covers the raw bytes, and
    // unauthenticated requests should cost as little as possible.
    if !verify_signature(&body, app_state.webhook_secret(), Some(signature)) {
        warn!(
            delivery_id = headers.get(HEADER_DELIVERY).and_then(|v| v.to_str().ok()),
            "Invalid webhook signature"
        );
        return Err(WebhookError::InvalidSignature);
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)?;

    let event = get_header(&headers, HEADER_EVENT)?;
    let delivery_id = get_header(&headers, HEADER_DELIVERY)?;
    let delivery = WebhookDelivery::new(delivery_id, event, payload);

    debug!(
        delivery_id = %delivery.id,
        event = %delivery.name,
        action = delivery.action(),
        "Received webhook"
    );

    let (delivery_id, event) = (delivery.id.clone(), delivery.name.clone());
    app_state.queue().enqueue(delivery).await?;

    info!(delivery_id = %delivery_id, event = %event, "Webhook queued");
    Ok((StatusCode::OK, ACK_BODY))
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}
