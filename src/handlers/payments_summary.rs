use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::error;

use crate::models::payment::PaymentSummaryResponse;
use crate::store::PaymentStore;
use crate::utils::time;

#[derive(Deserialize)]
pub struct SummaryQuery {
    from: Option<String>,
    to: Option<String>,
}

pub async fn get_summary(
    State(store): State<PaymentStore>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<PaymentSummaryResponse>, (StatusCode, String)> {
    let from = parse_bound(query.from.as_deref())?;
    let to = parse_bound(query.to.as_deref())?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err((
                StatusCode::BAD_REQUEST,
                "'from' must not be after 'to'".to_string(),
            ));
        }
    }

    let summary = store.summary_by_time(from, to).await.map_err(|err| {
        error!("failed to compute payment summary: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to compute summary".to_string(),
        )
    })?;

    Ok(Json(summary.into()))
}

pub(crate) fn parse_bound(
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, (StatusCode, String)> {
    match raw {
        None | Some("") => Ok(None),
        Some(raw) => time::parse_flexible(raw)
            .map(Some)
            .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string())),
    }
}
