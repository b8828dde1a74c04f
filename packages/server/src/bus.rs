//! In-memory message bus for tests and single-process runs.
//!
//! Implements the [`MessageBus`] seam with per-topic fan-out over bounded
//! mpsc channels: ordered per topic, delivered to every live subscriber.
//! Stands in for an external broker; topic administration and consumer-group
//! semantics stay out of scope, so a multi-worker deployment needs a real
//! bus behind the same trait.

use async_trait::async_trait;
use calcbus_core::{BusError, BusRecord, BusSubscription, MessageBus};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::trace;

/// Default per-subscriber channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Process-local publish/subscribe bus keyed by topic name.
#[derive(Debug)]
pub struct InMemoryBus {
    topics: DashMap<String, Vec<mpsc::Sender<BusRecord>>>,
    capacity: usize,
}

impl InMemoryBus {
    /// Creates a bus with the default subscriber channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus with an explicit subscriber channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    /// Number of live subscribers on a topic. Test-facing.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |subs| subs.len())
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let record = BusRecord {
            key: key.to_string(),
            payload,
        };

        // Clone the sender list so no map guard is held across an await.
        let senders: Vec<_> = self
            .topics
            .get(topic)
            .map(|subs| subs.value().clone())
            .unwrap_or_default();

        trace!(topic, key, subscribers = senders.len(), "publishing record");

        let mut saw_closed = false;
        for tx in senders {
            if tx.send(record.clone()).await.is_err() {
                saw_closed = true;
            }
        }

        if saw_closed {
            if let Some(mut subs) = self.topics.get_mut(topic) {
                subs.retain(|tx| !tx.is_closed());
            }
        }

        // A topic with no subscribers accepts the publish; like a broker,
        // delivery requires someone to be listening, not publishing to fail.
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BusSubscription, BusError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.topics.entry(topic.to_string()).or_default().push(tx);
        Ok(BusSubscription::new(rx))
    }
}
