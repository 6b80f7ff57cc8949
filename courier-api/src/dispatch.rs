use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use courier_core::{Channel, EstimateRequest, EstimateResult, ProviderKey};
use courier_dispatch::{CancelOutcome, CancelStatus, DispatchAttempt};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub channel: Channel,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EstimateBody {
    pub provider: ProviderKey,
    #[serde(flatten)]
    pub request: EstimateRequest,
}

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders/{order_id}/dispatch
/// Fired by the order flow once an order is confirmed. Always 200: the
/// outcome is in the body. Only a malformed request body is an error.
pub async fn dispatch_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<Json<DispatchAttempt>, AppError> {
    let Json(req) = payload?;
    let idempotency_key = req
        .idempotency_key
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            headers
                .get(IDEMPOTENCY_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let attempt = state.dispatch.auto_dispatch(order_id, req.channel, &idempotency_key).await;
    tracing::debug!("Dispatch for order {} finished as {}", order_id, attempt.status.as_str());
    Ok(Json(attempt))
}

/// POST /v1/orders/{order_id}/shipment/cancel
pub async fn cancel_shipment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> (StatusCode, Json<CancelOutcome>) {
    let outcome = state.dispatch.cancel_dispatch(order_id).await;
    let status = match outcome.status {
        CancelStatus::Canceled => StatusCode::OK,
        CancelStatus::Rejected => StatusCode::CONFLICT,
        CancelStatus::NotFound => StatusCode::NOT_FOUND,
    };
    (status, Json(outcome))
}

/// POST /v1/delivery/estimate
pub async fn estimate_delivery(
    State(state): State<AppState>,
    payload: Result<Json<EstimateBody>, JsonRejection>,
) -> Result<(StatusCode, Json<EstimateResult>), AppError> {
    let Json(body) = payload?;
    if body.request.origin.address_line1.trim().is_empty()
        || body.request.destination.address_line1.trim().is_empty()
    {
        return Err(AppError::ValidationError("Origin and destination addresses are required".to_string()));
    }

    let quote = state.dispatch.estimate(&body.provider, &body.request).await;
    let status = if quote.success { StatusCode::OK } else { StatusCode::BAD_GATEWAY };
    Ok((status, Json(quote)))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
