//! Request gateway: the synchronous face of the asynchronous bus.
//!
//! Each call registers a waiter, publishes the request keyed by its
//! correlation ID, and suspends until the dispatcher resolves the waiter or
//! the deadline fires. Locally detectable input errors short-circuit before
//! any registry or bus interaction.

use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use calcbus_core::{BusError, CorrelationId, MessageBus, OperationKind, OperationReply, OperationRequest};
use tracing::debug;

use crate::correlation::{CorrelationRegistry, WaitError};

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Everything that can go wrong on the synchronous side of a call.
///
/// Client faults (bad input, domain errors carried back in the reply) and
/// server faults (timeout, transport) map to different HTTP status classes;
/// see [`GatewayError::is_client_fault`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// An operand failed to parse as a decimal. Resolved entirely within
    /// the gateway; the bus is never touched.
    #[error("Invalid number format")]
    InvalidOperand,
    /// The supplied correlation ID already scopes an outstanding request.
    #[error("duplicate correlation id: {0}")]
    DuplicateCorrelation(CorrelationId),
    /// A failure the worker carried back as data, e.g. division by zero.
    #[error("{0}")]
    Domain(String),
    /// No reply observed before the deadline.
    #[error("no reply received within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Publish failed at the bus boundary.
    #[error("bus transport failure: {0}")]
    Transport(#[from] BusError),
    /// The request payload could not be encoded.
    #[error("request encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    /// The waiter was dropped without a reply (service shutting down).
    #[error("request abandoned before a reply arrived")]
    Abandoned,
}

impl GatewayError {
    /// True for faults attributable to the caller's input or request data.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidOperand | Self::DuplicateCorrelation(_) | Self::Domain(_)
        )
    }
}

impl From<WaitError> for GatewayError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            WaitError::Abandoned => Self::Abandoned,
        }
    }
}

// ---------------------------------------------------------------------------
// RequestGateway
// ---------------------------------------------------------------------------

/// Turns a fire-and-forget publish into a call-and-return abstraction.
pub struct RequestGateway {
    registry: Arc<CorrelationRegistry>,
    bus: Arc<dyn MessageBus>,
    request_topic: String,
    timeout: Duration,
}

impl RequestGateway {
    /// Creates a gateway publishing to `request_topic` with a fixed
    /// per-call deadline.
    pub fn new(
        registry: Arc<CorrelationRegistry>,
        bus: Arc<dyn MessageBus>,
        request_topic: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            bus,
            request_topic: request_topic.into(),
            timeout,
        }
    }

    /// Performs one operation synchronously.
    ///
    /// The waiter is deregistered on every exit path -- success, domain
    /// error, timeout, or transport failure -- so no entry outlives its call.
    ///
    /// # Errors
    ///
    /// See [`GatewayError`] for the full taxonomy. A success return always
    /// carries a well-formed success reply.
    pub async fn call(
        &self,
        kind: OperationKind,
        operand1: &str,
        operand2: &str,
        correlation_id: CorrelationId,
    ) -> Result<OperationReply, GatewayError> {
        let operand1: BigDecimal = operand1.parse().map_err(|_| GatewayError::InvalidOperand)?;
        let operand2: BigDecimal = operand2.parse().map_err(|_| GatewayError::InvalidOperand)?;

        let waiter = self
            .registry
            .register(correlation_id.clone())
            .map_err(|dup| GatewayError::DuplicateCorrelation(dup.0))?;

        let request = OperationRequest::new(kind, operand1, operand2);
        let payload = match serde_json::to_vec(&request) {
            Ok(payload) => payload,
            Err(err) => {
                self.registry.deregister(&correlation_id);
                return Err(err.into());
            }
        };

        debug!(
            correlation_id = %correlation_id,
            operation = kind.as_str(),
            topic = %self.request_topic,
            "publishing operation request"
        );
        if let Err(err) = self
            .bus
            .publish(&self.request_topic, correlation_id.as_str(), payload)
            .await
        {
            self.registry.deregister(&correlation_id);
            return Err(err.into());
        }

        let outcome = self.registry.await_reply(waiter, self.timeout).await;
        // Idempotent cleanup covering every path out of the wait.
        self.registry.deregister(&correlation_id);

        let reply = outcome?;
        match reply.outcome() {
            Ok(_) => Ok(reply),
            Err(message) => Err(GatewayError::Domain(message.to_string())),
        }
    }
}
