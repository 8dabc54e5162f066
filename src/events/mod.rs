use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the services after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderOpened {
        order_id: Uuid,
        branch_id: Uuid,
        started_at: DateTime<Utc>,
    },
    OrderFinalized {
        order_id: Uuid,
        invoice_id: Uuid,
    },
    InvoiceCreated(Uuid),
    InvoiceIssued(Uuid),
    InvoiceCancelled(Uuid),
    CustomerCreated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel with the sender already wrapped.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Runs until every sender is
/// dropped. Delivery is best-effort: services treat a send failure as a
/// warning, never as a request failure.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderOpened {
                order_id,
                branch_id,
                started_at,
            } => {
                info!(%order_id, %branch_id, %started_at, "order opened");
            }
            Event::OrderFinalized {
                order_id,
                invoice_id,
            } => {
                info!(%order_id, %invoice_id, "order finalized by invoice");
            }
            Event::InvoiceCreated(id) => info!(invoice_id = %id, "invoice created"),
            Event::InvoiceIssued(id) => info!(invoice_id = %id, "invoice issued"),
            Event::InvoiceCancelled(id) => info!(invoice_id = %id, "invoice cancelled"),
            Event::CustomerCreated(id) => info!(customer_id = %id, "customer created"),
        }
    }
    warn!("event channel closed, processor shutting down");
}
