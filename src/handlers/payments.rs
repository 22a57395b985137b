use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::handlers::payments_summary::parse_bound;
use crate::models::payment::{Payment, PaymentRequest, QueuedPayment};
use crate::store::PaymentStore;
use crate::utils::money;

// Não processa nada aqui: valida, converte para centavos, carimba o
// requested_at e enfileira. Os workers fazem o resto.
pub async fn create_payment(
    State(store): State<PaymentStore>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let request: PaymentRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!("invalid payment request: {}", err);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    if request.correlation_id.is_nil() {
        warn!("rejecting payment with nil correlation id");
        return Err(StatusCode::BAD_REQUEST);
    }

    let Some(amount) = money::decimal_to_cents(request.amount) else {
        warn!(
            "rejecting payment {} with invalid amount {}",
            request.correlation_id, request.amount
        );
        return Err(StatusCode::BAD_REQUEST);
    };

    let queued = QueuedPayment {
        correlation_id: request.correlation_id,
        amount,
        requested_at: Some(Utc::now()),
    };
    let payload = match serde_json::to_string(&queued) {
        Ok(payload) => payload,
        Err(err) => {
            error!("failed to encode queue payload: {}", err);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if let Err(err) = store.enqueue(&payload).await {
        error!(
            "failed to enqueue payment {}: {}",
            request.correlation_id, err
        );
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Payment accepted for processing",
            "correlationId": request.correlation_id,
        })),
    ))
}

#[derive(Deserialize)]
pub struct ListQuery {
    from: Option<String>,
    to: Option<String>,
}

// Leitura de auditoria: registros completos por janela de tempo
pub async fn list_payments(
    State(store): State<PaymentStore>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Payment>>, (StatusCode, String)> {
    let from = parse_bound(query.from.as_deref())?;
    let to = parse_bound(query.to.as_deref())?;

    let payments = store.payments_by_time(from, to).await.map_err(|err| {
        error!("failed to list payments: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to retrieve payments".to_string(),
        )
    })?;

    Ok(Json(payments))
}
