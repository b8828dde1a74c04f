//! Response dispatcher: resolves bus replies against the correlation registry.
//!
//! The dispatcher is deliberately thin: decode, validate, complete. Late or
//! unknown correlation IDs are an expected consequence of gateway timeouts
//! and are logged, never treated as errors.

use std::sync::Arc;

use calcbus_core::{BusError, BusRecord, MessageBus, OperationReply};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::correlation::CorrelationRegistry;

/// Continuously-running consumer of the reply topic.
pub struct ResponseDispatcher {
    bus: Arc<dyn MessageBus>,
    registry: Arc<CorrelationRegistry>,
    reply_topic: String,
}

impl ResponseDispatcher {
    /// Creates a dispatcher resolving replies from `reply_topic` against
    /// the shared registry.
    pub fn new(
        bus: Arc<dyn MessageBus>,
        registry: Arc<CorrelationRegistry>,
        reply_topic: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            registry,
            reply_topic: reply_topic.into(),
        }
    }

    /// Runs the consumption loop until shutdown is signalled or the
    /// subscription closes.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] only when the initial subscription fails.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), BusError> {
        let mut subscription = self.bus.subscribe(&self.reply_topic).await?;
        info!(topic = %self.reply_topic, "dispatcher consuming operation replies");

        loop {
            tokio::select! {
                record = subscription.recv() => match record {
                    Some(record) => self.handle_record(&record),
                    None => {
                        info!("reply subscription closed");
                        break;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        info!("dispatcher stopped");
        Ok(())
    }

    fn handle_record(&self, record: &BusRecord) {
        let reply = match serde_json::from_slice::<OperationReply>(&record.payload) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(key = %record.key, error = %err, "dropping undecodable reply");
                return;
            }
        };
        if !reply.is_well_formed() {
            warn!(key = %record.key, "dropping reply violating the value/error invariant");
            return;
        }

        let id = reply.correlation_id().clone();
        if self.registry.complete(&id, reply) {
            debug!(correlation_id = %id, "resolved pending waiter");
        }
    }
}
