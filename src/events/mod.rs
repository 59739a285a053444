use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after a workflow transaction commits.
///
/// Collaborators (notification fan-out, dashboards) consume these; they are
/// strictly informational and never feed back into ledger state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Transfer events
    TransferCreated {
        transfer_id: Uuid,
        seller_id: Uuid,
        total_items: i32,
    },
    TransferAccepted {
        transfer_id: Uuid,
        seller_id: Uuid,
        items_moved: i32,
    },
    TransferRejected {
        transfer_id: Uuid,
        seller_id: Uuid,
    },
    TransferCanceled {
        transfer_id: Uuid,
    },

    // Kit events
    KitAssigned {
        kit_id: Uuid,
        seller_id: Uuid,
    },
    KitAccepted {
        kit_id: Uuid,
        seller_id: Uuid,
        accepted_at: DateTime<Utc>,
    },
    KitRejected {
        kit_id: Uuid,
        seller_id: Uuid,
    },

    // Return events
    ReturnRequested {
        return_id: Uuid,
        seller_id: Uuid,
    },
    ReturnAccepted {
        return_id: Uuid,
        seller_id: Uuid,
        items_moved: i32,
    },
    ReturnRejected {
        return_id: Uuid,
        seller_id: Uuid,
    },

    // Inventory events
    StockReceived {
        company_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },

    // Quota events
    SaleRecorded {
        account_id: Uuid,
        sale_id: Uuid,
        sales_count: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
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

    /// Sends an event after a transaction has committed.
    ///
    /// The ledger change is already durable at this point, so a full channel
    /// or stopped consumer only costs the notification, never the operation.
    pub async fn send_post_commit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping post-commit event: {}", e);
        }
    }
}

/// Consumes domain events; downstream delivery (webhooks, notification
/// collaborators) hangs off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(?event, "domain event");
    }
    info!("Event channel closed; event processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_post_commit_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);
        drop(rx);

        // Must not panic or error out; the operation already committed.
        sender
            .send_post_commit(Event::TransferCanceled {
                transfer_id: Uuid::new_v4(),
            })
            .await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let transfer_id = Uuid::new_v4();
        sender
            .send(Event::TransferCreated {
                transfer_id,
                seller_id: Uuid::new_v4(),
                total_items: 3,
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::TransferCreated {
                transfer_id: got, ..
            }) => assert_eq!(got, transfer_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
