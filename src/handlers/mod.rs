pub mod payments;
pub mod payments_summary;
pub mod purge;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::store::PaymentStore;

pub fn router(store: PaymentStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/payments",
            post(payments::create_payment).get(payments::list_payments),
        )
        .route("/payments-summary", get(payments_summary::get_summary))
        .route("/purge-payments", post(purge::purge_payments))
        .with_state(store)
}

async fn health() -> StatusCode {
    StatusCode::OK
}
