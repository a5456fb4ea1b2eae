//! Background processing of accepted deliveries.
//!
//! The HTTP endpoint acknowledges a delivery as soon as it is verified and
//! parsed; handler work happens here, off the request path.
//!
//! ```text
//! ┌─────────────┐   enqueue   ┌──────────────┐   spawn per delivery   ┌─────────────────┐
//! │  POST /     │ ──────────► │ bounded mpsc │ ─────────────────────► │ router.dispatch │
//! │ (200 ack)   │             │   (256)      │                        │ (handlers, seq) │
//! └─────────────┘             └──────────────┘                        └─────────────────┘
//! ```
//!
//! Deliveries are independent: each gets its own task, and the only state
//! they share is the frozen router. On shutdown the loop stops accepting new
//! deliveries and waits for the in-flight ones to finish.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::delivery::WebhookDelivery;
use super::router::{DispatchReport, WebhookRouter};
use crate::error::{Error, Result};

/// Default number of deliveries that may wait for processing.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sending half of the dispatch queue, held by the HTTP endpoint.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    tx: mpsc::Sender<WebhookDelivery>,
}

impl DispatchQueue {
    /// Queues a delivery for processing.
    ///
    /// Waits while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns an `Internal` error if the dispatcher has stopped.
    pub async fn enqueue(&self, delivery: WebhookDelivery) -> Result<()> {
        let delivery_id = delivery.id.to_string();
        self.tx.send(delivery).await.map_err(|_| {
            Error::internal("Webhook dispatcher is not running")
                .with_detail("delivery_id", delivery_id)
        })
    }

    /// True once the dispatcher loop has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Freezes `router` and starts the dispatcher loop.
///
/// Returns the queue to hand to the HTTP layer and the loop's task handle,
/// which completes after `shutdown` is cancelled and in-flight deliveries
/// have finished.
pub fn spawn_dispatcher(
    router: WebhookRouter,
    capacity: usize,
    shutdown: CancellationToken,
) -> (DispatchQueue, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let router = Arc::new(router);

    info!(capacity, router = ?router, "Starting webhook dispatcher");
    let task = tokio::spawn(run(router, rx, shutdown));

    (DispatchQueue { tx }, task)
}

async fn run(
    router: Arc<WebhookRouter>,
    mut rx: mpsc::Receiver<WebhookDelivery>,
    shutdown: CancellationToken,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("Dispatcher shutting down");
                break;
            }

            received = rx.recv() => {
                let Some(delivery) = received else {
                    debug!("Dispatch queue closed");
                    break;
                };
                trace!(delivery_id = %delivery.id, "Dequeued delivery");

                let router = router.clone();
                in_flight.spawn(async move {
                    let report = router.dispatch(Arc::new(delivery)).await;
                    log_report(&report);
                });
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Delivery task did not complete");
                }
            }
        }
    }

    // Refuse further sends, then drain what was already accepted.
    rx.close();
    while let Some(delivery) = rx.recv().await {
        let router = router.clone();
        in_flight.spawn(async move {
            let report = router.dispatch(Arc::new(delivery)).await;
            log_report(&report);
        });
    }

    if !in_flight.is_empty() {
        debug!(remaining = in_flight.len(), "Waiting for in-flight deliveries");
    }
    while in_flight.join_next().await.is_some() {}
    info!("Dispatcher stopped");
}

fn log_report(report: &DispatchReport) {
    let failed = report.failures().count();
    if failed == 0 {
        debug!(
            delivery_id = %report.delivery_id,
            event = %report.event,
            handlers = report.handler_count(),
            "Delivery processed"
        );
    } else {
        warn!(
            delivery_id = %report.delivery_id,
            event = %report.event,
            handlers = report.handler_count(),
            failed,
            "Delivery processed with handler failures"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn queued_delivery_reaches_handler() {
        let (seen_tx, mut seen_rx) = unbounded_channel();
        let mut router = WebhookRouter::new();
        router.on("ping", move |d: Arc<WebhookDelivery>| {
            let seen_tx = seen_tx.clone();
            async move {
                seen_tx.send(d.payload.clone())?;
                Ok(())
            }
        });

        let shutdown = CancellationToken::new();
        let (queue, task) = spawn_dispatcher(router, 8, shutdown.clone());

        queue
            .enqueue(WebhookDelivery::new("d-1", "ping", json!({"zen": "test"})))
            .await
            .unwrap();

        let payload = timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload, json!({"zen": "test"}));

        shutdown.cancel();
        timeout(WAIT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failing_delivery_does_not_stop_the_loop() {
        let (seen_tx, mut seen_rx) = unbounded_channel();
        let mut router = WebhookRouter::new();
        router.on("push", |_| async { Err(anyhow::anyhow!("always fails")) });
        router.on("ping", move |d: Arc<WebhookDelivery>| {
            let seen_tx = seen_tx.clone();
            async move {
                seen_tx.send(d.id.clone())?;
                Ok(())
            }
        });

        let shutdown = CancellationToken::new();
        let (queue, task) = spawn_dispatcher(router, 8, shutdown.clone());

        queue
            .enqueue(WebhookDelivery::new("d-1", "push", json!({})))
            .await
            .unwrap();
        queue
            .enqueue(WebhookDelivery::new("d-2", "ping", json!({})))
            .await
            .unwrap();

        let id = timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
        assert_eq!(id.as_str(), "d-2");

        shutdown.cancel();
        timeout(WAIT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_deliveries() {
        let (started_tx, mut started_rx) = unbounded_channel();
        let (finished_tx, mut finished_rx) = unbounded_channel();
        let mut router = WebhookRouter::new();
        router.on("slow", move |_| {
            let started_tx = started_tx.clone();
            let finished_tx = finished_tx.clone();
            async move {
                started_tx.send(())?;
                tokio::time::sleep(Duration::from_millis(100)).await;
                finished_tx.send(())?;
                Ok(())
            }
        });

        let shutdown = CancellationToken::new();
        let (queue, task) = spawn_dispatcher(router, 8, shutdown.clone());
        queue
            .enqueue(WebhookDelivery::new("d-1", "slow", json!({})))
            .await
            .unwrap();

        timeout(WAIT, started_rx.recv()).await.unwrap().unwrap();
        shutdown.cancel();
        timeout(WAIT, task).await.unwrap().unwrap();

        assert!(finished_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_internal_error() {
        let shutdown = CancellationToken::new();
        let (queue, task) = spawn_dispatcher(WebhookRouter::new(), 8, shutdown.clone());

        shutdown.cancel();
        timeout(WAIT, task).await.unwrap().unwrap();
        assert!(queue.is_closed());

        let err = queue
            .enqueue(WebhookDelivery::new("d-9", "ping", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.detail("delivery_id"), Some(&json!("d-9")));
    }
}
