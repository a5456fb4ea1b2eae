//! Event routing from webhook deliveries to registered handlers.
//!
//! Handlers are registered under a key:
//! - an event name (`"ping"`, `"pull_request"`)
//! - an event name and action (`"pull_request.opened"`)
//! - every event, via [`WebhookRouter::on_any`]
//!
//! A delivery runs wildcard handlers first, then event handlers, then
//! event-and-action handlers, each group in registration order. Handlers run
//! one at a time, each in its own task: a handler that returns an error or
//! panics is recorded in the [`DispatchReport`] and the remaining handlers
//! still run.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::delivery::WebhookDelivery;
use crate::types::DeliveryId;

/// The future returned by a boxed handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type BoxedHandler = Arc<dyn Fn(Arc<WebhookDelivery>) -> HandlerFuture + Send + Sync>;

/// Registration key for handlers that receive every delivery.
pub const WILDCARD: &str = "*";

/// Why a single handler did not complete successfully.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler failed: {0:#}")]
    Failed(anyhow::Error),

    /// The handler panicked; the panic was contained in its task.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// The result of running one handler.
#[derive(Debug)]
pub struct HandlerOutcome {
    /// The key the handler was registered under.
    pub key: String,

    /// Position of the handler among all handlers run for the delivery.
    pub position: usize,

    pub result: Result<(), HandlerError>,
}

impl HandlerOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-handler results for one delivery.
#[derive(Debug)]
pub struct DispatchReport {
    pub delivery_id: DeliveryId,
    pub event: String,
    pub outcomes: Vec<HandlerOutcome>,
}

impl DispatchReport {
    /// True when every handler succeeded. A delivery with no handlers succeeds.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(HandlerOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn handler_count(&self) -> usize {
        self.outcomes.len()
    }
}

/// Maps event names to ordered lists of asynchronous handlers.
///
/// Registration happens during setup through `&mut self`; once the router is
/// handed to the dispatcher it is shared behind an `Arc` and never changes.
#[derive(Default)]
pub struct WebhookRouter {
    handlers: HashMap<String, Vec<BoxedHandler>>,
}

impl fmt::Debug for WebhookRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .handlers
            .iter()
            .map(|(key, list)| (key.as_str(), list.len()))
            .collect();
        keys.sort_unstable();
        f.debug_struct("WebhookRouter").field("handlers", &keys).finish()
    }
}

impl WebhookRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the list for `key` (`"event"` or `"event.action"`).
    pub fn on<F, Fut>(&mut self, key: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Arc<WebhookDelivery>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let boxed: BoxedHandler =
            Arc::new(move |delivery: Arc<WebhookDelivery>| -> HandlerFuture {
                Box::pin(handler(delivery))
            });
        self.handlers.entry(key.into()).or_default().push(boxed);
        self
    }

    /// Appends `handler` to the list run for every delivery.
    pub fn on_any<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Arc<WebhookDelivery>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(WILDCARD, handler)
    }

    /// Number of handlers registered under exactly `key`.
    pub fn handler_count(&self, key: &str) -> usize {
        self.handlers.get(key).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }

    /// Handlers for `delivery`, in run order, paired with their keys.
    fn matching(&self, delivery: &WebhookDelivery) -> Vec<(String, BoxedHandler)> {
        // An event literally named "*" only reaches the wildcard list once.
        let mut keys = vec![WILDCARD.to_string()];
        if delivery.name != WILDCARD {
            keys.push(delivery.name.clone());
            if let Some(action) = delivery.action() {
                keys.push(format!("{}.{action}", delivery.name));
            }
        }

        keys.into_iter()
            .filter_map(|key| self.handlers.get(&key).map(|list| (key, list)))
            .flat_map(|(key, list)| list.iter().map(move |h| (key.clone(), h.clone())))
            .collect()
    }

    /// Runs every matching handler in order and collects their outcomes.
    ///
    /// Never fails: an event nobody listens to yields an empty, successful
    /// report.
    #[instrument(skip(self, delivery), fields(delivery_id = %delivery.id, event = %delivery.name))]
    pub async fn dispatch(&self, delivery: Arc<WebhookDelivery>) -> DispatchReport {
        let matching = self.matching(&delivery);
        debug!(handlers = matching.len(), "Dispatching webhook");

        let mut outcomes = Vec::with_capacity(matching.len());
        for (position, (key, handler)) in matching.into_iter().enumerate() {
            let result = run_isolated(handler, delivery.clone()).await;
            if let Err(e) = &result {
                warn!(handler = %key, position, error = %e, "Webhook handler failed");
            }
            outcomes.push(HandlerOutcome {
                key,
                position,
                result,
            });
        }

        DispatchReport {
            delivery_id: delivery.id.clone(),
            event: delivery.name.clone(),
            outcomes,
        }
    }
}

/// Runs one handler in its own task so a panic stays inside it.
async fn run_isolated(
    handler: BoxedHandler,
    delivery: Arc<WebhookDelivery>,
) -> Result<(), HandlerError> {
    match tokio::spawn(async move { handler(delivery).await }).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerError::Failed(e)),
        Err(join_error) if join_error.is_panic() => {
            Err(HandlerError::Panicked(panic_message(join_error.into_panic())))
        }
        Err(join_error) => Err(HandlerError::Failed(anyhow::Error::new(join_error))),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
