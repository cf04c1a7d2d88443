use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services. Processing is in-process and
/// best-effort: the processor logs each event for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Transaction events
    TransactionCreated {
        transaction_id: Uuid,
        reference_number: String,
    },
    TransactionUpdated(Uuid),
    TransactionDeleted {
        transaction_id: Uuid,
        reference_number: String,
    },
    TransferCreated {
        outbound_id: Uuid,
        inbound_id: Uuid,
    },

    // Count workflow events
    AdjustmentGenerated {
        transaction_id: Uuid,
        reference_number: String,
        line_count: usize,
    },
    CountCompleted {
        warehouse: String,
        count_date: NaiveDate,
    },

    // Auth events
    UserSignedIn(Uuid),
    UserSignedOut(Uuid),
    UserCreated(Uuid),
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

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel pair.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Spawned once at startup;
/// exits when every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = %payload, "domain event"),
            Err(e) => warn!("Failed to serialize event {:?}: {}", event, e),
        }
    }
    info!("Event channel closed; processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (sender, mut rx) = channel(8);
        sender
            .send(Event::UserSignedIn(Uuid::nil()))
            .await
            .unwrap();
        match rx.recv().await {
            Some(Event::UserSignedIn(id)) => assert_eq!(id, Uuid::nil()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (sender, rx) = channel(1);
        drop(rx);
        assert!(sender.send(Event::UserSignedOut(Uuid::nil())).await.is_err());
    }
}
