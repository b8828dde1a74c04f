//! Worker: consumes operation requests and always answers.
//!
//! Every consumed record produces exactly one reply keyed by the same
//! correlation ID -- success, domain error, or a failure for a payload that
//! would not decode. That strict contract is what makes the gateway's
//! bounded wait meaningful. Nothing short of shutdown or bus closure stops
//! the loop; one bad request never blocks the next.

use std::sync::Arc;

use calcbus_core::{BusError, BusRecord, CorrelationId, MessageBus, OperationReply, OperationRequest};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::calculator;

/// Continuously-running consumer of the request topic.
pub struct Worker {
    bus: Arc<dyn MessageBus>,
    request_topic: String,
    reply_topic: String,
}

impl Worker {
    /// Creates a worker consuming `request_topic` and replying on
    /// `reply_topic`.
    pub fn new(
        bus: Arc<dyn MessageBus>,
        request_topic: impl Into<String>,
        reply_topic: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            request_topic: request_topic.into(),
            reply_topic: reply_topic.into(),
        }
    }

    /// Runs the consumption loop until shutdown is signalled or the
    /// subscription closes.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] only when the initial subscription fails;
    /// per-record faults are converted into failure replies or logged.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), BusError> {
        let mut subscription = self.bus.subscribe(&self.request_topic).await?;
        info!(topic = %self.request_topic, "worker consuming operation requests");

        loop {
            tokio::select! {
                record = subscription.recv() => match record {
                    Some(record) => self.handle_record(record).await,
                    None => {
                        info!("request subscription closed");
                        break;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        info!("worker stopped");
        Ok(())
    }

    /// Evaluates one record and publishes its single reply.
    async fn handle_record(&self, record: BusRecord) {
        let correlation_id = CorrelationId::from(record.key.as_str());

        let reply = match serde_json::from_slice::<OperationRequest>(&record.payload) {
            Ok(request) => {
                debug!(
                    correlation_id = %correlation_id,
                    operation = request.kind.as_str(),
                    "processing operation request"
                );
                match calculator::evaluate(request.kind, &request.operand1, &request.operand2) {
                    Ok(value) => {
                        debug!(correlation_id = %correlation_id, value = %value, "operation succeeded");
                        OperationReply::success(correlation_id.clone(), request.kind, value)
                    }
                    Err(err) => {
                        warn!(correlation_id = %correlation_id, error = %err, "operation failed");
                        OperationReply::failure(correlation_id.clone(), err.to_string())
                    }
                }
            }
            Err(err) => {
                warn!(correlation_id = %correlation_id, error = %err, "undecodable request payload");
                OperationReply::failure(correlation_id.clone(), "malformed request payload")
            }
        };

        let payload = match serde_json::to_vec(&reply) {
            Ok(payload) => payload,
            Err(err) => {
                // Reply encoding cannot fail for these types; if it somehow
                // does, the waiter's deadline is the backstop.
                error!(correlation_id = %correlation_id, error = %err, "failed to encode reply");
                return;
            }
        };

        if let Err(err) = self
            .bus
            .publish(&self.reply_topic, correlation_id.as_str(), payload)
            .await
        {
            error!(correlation_id = %correlation_id, error = %err, "failed to publish reply");
        }
    }
}
