//! Identifier and enum types shared by the gateway, worker, and dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CorrelationId
// ---------------------------------------------------------------------------

/// Opaque token tying one asynchronous request to its eventual reply.
///
/// The value is either propagated from an inbound `x-request-id` header or
/// minted by the server. The registry treats it as an opaque string; it is
/// also the bus record key on both the request and reply channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wraps an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Arithmetic operation requested by a caller.
///
/// Wire names are lowercase. The enum is closed: a request carrying an
/// unknown kind fails to decode and the worker answers it with a
/// failure-variant reply instead of crashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OperationKind {
    /// Returns the lowercase wire name of the operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_round_trips_as_transparent_string() {
        let id = CorrelationId::from("req-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"req-42\"");

        let back: CorrelationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn correlation_id_display_matches_inner() {
        let id = CorrelationId::new("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn operation_kind_wire_names_are_lowercase() {
        assert_eq!(serde_json::to_string(&OperationKind::Add).unwrap(), "\"add\"");
        assert_eq!(
            serde_json::to_string(&OperationKind::Divide).unwrap(),
            "\"divide\""
        );
    }

    #[test]
    fn unknown_operation_kind_fails_to_decode() {
        let result: Result<OperationKind, _> = serde_json::from_str("\"modulo\"");
        assert!(result.is_err());
    }

    #[test]
    fn operation_kind_as_str() {
        assert_eq!(OperationKind::Subtract.as_str(), "subtract");
        assert_eq!(OperationKind::Multiply.to_string(), "multiply");
    }
}
