//! Message-bus adapter boundary.
//!
//! The bus is an external collaborator: an ordered, keyed publish/subscribe
//! channel that guarantees delivery to subscribed consumers but never a
//! synchronous response. This module only defines the seam -- a `publish` /
//! `subscribe` trait plus the record and error types that cross it. Topic
//! administration, partitioning, and consumer-group semantics belong to the
//! implementation behind the trait.

use async_trait::async_trait;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// BusRecord
// ---------------------------------------------------------------------------

/// A single keyed record as delivered by the bus.
///
/// The key is the correlation ID on both the request and reply channels;
/// the payload is the JSON-encoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusRecord {
    pub key: String,
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// BusError
// ---------------------------------------------------------------------------

/// Failures at the bus boundary. Surfaced to callers as transport errors.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("publish to topic '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
    #[error("subscribe to topic '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },
    #[error("bus connection closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// BusSubscription
// ---------------------------------------------------------------------------

/// A consumer's view of one topic: an ordered stream of records.
///
/// Yields `None` once the bus side closes, which consumption loops treat as
/// a shutdown signal.
#[derive(Debug)]
pub struct BusSubscription {
    rx: mpsc::Receiver<BusRecord>,
}

impl BusSubscription {
    /// Wraps the receiving half handed out by a bus implementation.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<BusRecord>) -> Self {
        Self { rx }
    }

    /// Receives the next record, or `None` when the subscription is closed.
    pub async fn recv(&mut self) -> Option<BusRecord> {
        self.rx.recv().await
    }
}

// ---------------------------------------------------------------------------
// MessageBus trait
// ---------------------------------------------------------------------------

/// Ordered, keyed publish/subscribe transport connecting gateway, worker,
/// and dispatcher.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes one keyed record to a topic.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the record cannot be handed to the
    /// transport. Delivery past that point is the bus's guarantee.
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Opens a subscription to a topic.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the subscription cannot be established.
    async fn subscribe(&self, topic: &str) -> Result<BusSubscription, BusError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_yields_records_in_order() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = BusSubscription::new(rx);

        for i in 0..3 {
            tx.send(BusRecord {
                key: format!("k{i}"),
                payload: vec![i],
            })
            .await
            .unwrap();
        }

        assert_eq!(sub.recv().await.unwrap().key, "k0");
        assert_eq!(sub.recv().await.unwrap().key, "k1");
        assert_eq!(sub.recv().await.unwrap().key, "k2");
    }

    #[tokio::test]
    async fn subscription_ends_when_sender_drops() {
        let (tx, rx) = mpsc::channel::<BusRecord>(1);
        let mut sub = BusSubscription::new(rx);
        drop(tx);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn bus_error_messages_name_the_topic() {
        let err = BusError::Publish {
            topic: "operation-requests".to_string(),
            reason: "broker unreachable".to_string(),
        };
        assert!(err.to_string().contains("operation-requests"));
        assert!(err.to_string().contains("broker unreachable"));
    }
}
