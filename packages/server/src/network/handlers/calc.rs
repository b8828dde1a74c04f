//! Calculator endpoints: the synchronous entry points over the bus.
//!
//! Four operations, each taking two decimal-string operands as query
//! parameters. The correlation ID is the `x-request-id` the middleware
//! placed in the request extensions (caller-supplied or freshly minted) and
//! is echoed in both the body and the response header.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use calcbus_core::{CorrelationId, OperationKind, OperationReply};
use serde::Deserialize;
use tower_http::request_id::RequestId;
use uuid::Uuid;

use super::AppState;
use crate::gateway::GatewayError;

/// Query parameters shared by all four operations.
#[derive(Debug, Deserialize)]
pub struct OperandParams {
    pub operand1: String,
    pub operand2: String,
}

/// `GET /add?operand1=..&operand2=..`
pub async fn add_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<OperandParams>,
) -> (StatusCode, Json<OperationReply>) {
    perform(&state, OperationKind::Add, &request_id, &params).await
}

/// `GET /subtract?operand1=..&operand2=..`
pub async fn subtract_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<OperandParams>,
) -> (StatusCode, Json<OperationReply>) {
    perform(&state, OperationKind::Subtract, &request_id, &params).await
}

/// `GET /multiply?operand1=..&operand2=..`
pub async fn multiply_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<OperandParams>,
) -> (StatusCode, Json<OperationReply>) {
    perform(&state, OperationKind::Multiply, &request_id, &params).await
}

/// `GET /divide?operand1=..&operand2=..`
pub async fn divide_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<OperandParams>,
) -> (StatusCode, Json<OperationReply>) {
    perform(&state, OperationKind::Divide, &request_id, &params).await
}

/// Shared path: run the gateway call, map its outcome onto a status and a
/// reply body that always carries the correlation ID.
async fn perform(
    state: &AppState,
    kind: OperationKind,
    request_id: &RequestId,
    params: &OperandParams,
) -> (StatusCode, Json<OperationReply>) {
    let _guard = state.shutdown.in_flight_guard();
    let correlation_id = correlation_from(request_id);

    match state
        .gateway
        .call(kind, &params.operand1, &params.operand2, correlation_id.clone())
        .await
    {
        Ok(reply) => (StatusCode::OK, Json(reply)),
        Err(err) => {
            let status = error_status(&err);
            (
                status,
                Json(OperationReply::failure(correlation_id, err.to_string())),
            )
        }
    }
}

/// Extracts the correlation ID from the request-ID extension. A UUID
/// fallback covers a non-UTF-8 or empty header, which the set layer never
/// produces on its own.
fn correlation_from(request_id: &RequestId) -> CorrelationId {
    match request_id.header_value().to_str() {
        Ok(value) if !value.is_empty() => CorrelationId::from(value),
        _ => CorrelationId::from(Uuid::new_v4().to_string()),
    }
}

/// Client faults get 400; timeouts 504; transport failures 502; the rest 500.
fn error_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::InvalidOperand
        | GatewayError::DuplicateCorrelation(_)
        | GatewayError::Domain(_) => StatusCode::BAD_REQUEST,
        GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Encode(_) | GatewayError::Abandoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
