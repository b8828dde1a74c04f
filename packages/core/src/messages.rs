//! Wire messages exchanged over the request and reply channels.
//!
//! Both payloads are encoded as JSON with camelCase field names. Decimal
//! operands and results are string-encoded on the wire (bigdecimal's serde
//! representation), so no precision is lost to binary floating point.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{CorrelationId, OperationKind};

// ---------------------------------------------------------------------------
// OperationRequest
// ---------------------------------------------------------------------------

/// A request consumed by the worker. Keyed on the bus by its correlation ID.
///
/// Immutable once constructed; operands are already-parsed decimals because
/// input validation happens at the gateway, before any bus interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub operand1: BigDecimal,
    pub operand2: BigDecimal,
}

impl OperationRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(kind: OperationKind, operand1: BigDecimal, operand2: BigDecimal) -> Self {
        Self {
            kind,
            operand1,
            operand2,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationReply
// ---------------------------------------------------------------------------

/// The single reply published for every consumed request.
///
/// Exactly one of `value` / `error` is populated. The constructors are the
/// only way to build a reply, so a locally-created reply always satisfies
/// that invariant; a deserialized reply must be checked with
/// [`OperationReply::is_well_formed`] before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReply {
    correlation_id: CorrelationId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    operation: Option<OperationKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    value: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    error: Option<String>,
}

impl OperationReply {
    /// Builds a success reply carrying the computed value.
    #[must_use]
    pub fn success(correlation_id: CorrelationId, kind: OperationKind, value: BigDecimal) -> Self {
        Self {
            correlation_id,
            operation: Some(kind),
            value: Some(value),
            error: None,
        }
    }

    /// Builds a failure reply carrying a human-readable error message.
    #[must_use]
    pub fn failure(correlation_id: CorrelationId, error: impl Into<String>) -> Self {
        Self {
            correlation_id,
            operation: None,
            value: None,
            error: Some(error.into()),
        }
    }

    /// The correlation ID this reply resolves.
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// The operation kind, present on success replies.
    #[must_use]
    pub fn operation(&self) -> Option<OperationKind> {
        self.operation
    }

    /// True when exactly one of value/error is populated.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        matches!(
            (&self.value, &self.error),
            (Some(_), None) | (None, Some(_))
        )
    }

    /// The carried outcome: the computed value or the error message.
    ///
    /// A reply that violates the either/or invariant (possible only after
    /// deserialization) reports itself as an error.
    pub fn outcome(&self) -> Result<&BigDecimal, &str> {
        match (&self.value, &self.error) {
            (Some(value), None) => Ok(value),
            (None, Some(error)) => Err(error),
            _ => Err("malformed reply: exactly one of value/error must be set"),
        }
    }
}
