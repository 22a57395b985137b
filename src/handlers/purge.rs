use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::Value;
use tracing::{error, info};

use crate::store::PaymentStore;

pub async fn purge_payments(
    State(store): State<PaymentStore>,
) -> Result<Json<Value>, StatusCode> {
    if let Err(err) = store.purge_all().await {
        error!("failed to purge payment data: {}", err);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    info!("payment data purged");
    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Payment data purged successfully",
    })))
}
