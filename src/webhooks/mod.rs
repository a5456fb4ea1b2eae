//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Routing of verified deliveries to registered handlers
//! - A background dispatcher so the HTTP response never waits on handlers

pub mod delivery;
pub mod dispatcher;
pub mod router;
pub mod signature;

pub use delivery::WebhookDelivery;
pub use dispatcher::{DEFAULT_QUEUE_CAPACITY, DispatchQueue, spawn_dispatcher};
pub use router::{
    DispatchReport, HandlerError, HandlerFuture, HandlerOutcome, WILDCARD, WebhookRouter,
};
pub use signature::{
    SIGNATURE_PREFIX, compute_signature, format_signature_header, parse_signature_header, sign,
    verify_signature,
};
