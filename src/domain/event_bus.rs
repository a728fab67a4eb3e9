//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every committed
//! session mutation publishes its [`SessionEvent`]s through the bus, and
//! each WebSocket connection subscribes and filters by session.

use tokio::sync::broadcast;

use super::SessionEvent;

/// Broadcast bus for [`SessionEvent`]s.
///
/// When the ring buffer is full, the oldest events are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Publishes the events of one commit, in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = SessionEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Money, PartId, PaymentId, SessionId, SplitId};
    use chrono::Utc;

    fn opened(session_id: SessionId) -> SessionEvent {
        SessionEvent::SessionOpened {
            session_id,
            order_id: "order-1".to_string(),
            total_amount: Money::from_minor(10_000),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_is_dropped() {
        let bus = EventBus::new(100);
        assert_eq!(bus.publish(opened(SessionId::new())), 0);
    }

    #[tokio::test]
    async fn commit_batch_arrives_in_order() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let session_id = SessionId::new();
        let now = Utc::now();

        bus.publish_all([
            SessionEvent::PartPaid {
                session_id,
                split_id: SplitId::new(),
                part_id: PartId::new(),
                payment_id: PaymentId::new(),
                amount: Money::from_minor(5_000),
                timestamp: now,
            },
            SessionEvent::SessionCompleted {
                session_id,
                total_amount: Money::from_minor(10_000),
                paid_amount: Money::from_minor(10_000),
                timestamp: now,
            },
        ]);

        let (Ok(first), Ok(second)) = (rx.recv().await, rx.recv().await) else {
            panic!("expected two events");
        };
        assert_eq!(first.event_type_str(), "part_paid");
        assert_eq!(second.event_type_str(), "session_completed");
    }

    #[tokio::test]
    async fn slow_receiver_lags_instead_of_blocking() {
        let bus = EventBus::new(1);
        let mut rx = bus.subscribe();
        let latest = SessionId::new();
        bus.publish_all([opened(SessionId::new()), opened(latest)]);

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        let Ok(event) = rx.recv().await else {
            panic!("expected the newest event");
        };
        assert_eq!(event.session_id(), latest);
    }
}
