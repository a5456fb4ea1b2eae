//! A verified webhook delivery.

use serde_json::Value;

use crate::types::{DeliveryId, InstallationId};

/// One verified, parsed webhook delivery.
///
/// Only constructed after the signature check has passed, so handlers never
/// see an unverified payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookDelivery {
    /// The `X-GitHub-Delivery` header.
    pub id: DeliveryId,

    /// The `X-GitHub-Event` header (e.g. `"pull_request"`).
    pub name: String,

    /// The parsed JSON body.
    pub payload: Value,
}

impl WebhookDelivery {
    pub fn new(id: impl Into<DeliveryId>, name: impl Into<String>, payload: Value) -> Self {
        WebhookDelivery {
            id: id.into(),
            name: name.into(),
            payload,
        }
    }

    /// The payload's `action` field, if it has one.
    pub fn action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }

    /// The `installation.id` of the payload, present on deliveries to apps.
    pub fn installation_id(&self) -> Option<InstallationId> {
        self.payload
            .get("installation")
            .and_then(|i| i.get("id"))
            .and_then(Value::as_u64)
            .map(InstallationId)
    }
}
