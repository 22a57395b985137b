use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::money;
use crate::utils::time::{rfc3339_nanos, rfc3339_nanos_opt};

// Qual processor liquidou o pagamento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Default,
    Fallback,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Default => "default",
            Service::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub correlation_id: Uuid,
    pub amount: f64,
}

// Payload da fila de entrada: amount já em centavos. O ingress carimba o
// requested_at; se chegar sem, o worker carimba antes de enviar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedPayment {
    pub correlation_id: Uuid,
    pub amount: i64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rfc3339_nanos_opt"
    )]
    pub requested_at: Option<DateTime<Utc>>,
}

// Pagamento aceito por um processor. Imutável depois de gravado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub correlation_id: Uuid,
    pub amount: i64,
    pub service: Service,
    #[serde(with = "rfc3339_nanos")]
    pub requested_at: DateTime<Utc>,
}

// Payload para enviar aos Payment Processors
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorPayload {
    pub correlation_id: Uuid,
    pub amount: f64,
    #[serde(with = "rfc3339_nanos")]
    pub requested_at: DateTime<Utc>,
}

// O body de health também traz minResponseTime, que o roteamento ignora
#[derive(Debug, Deserialize)]
pub struct HealthCheckResponse {
    pub failing: bool,
}

// Totais por serviço, em centavos inteiros
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_requests: u64,
    pub total_amount_cents: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentSummary {
    pub default: Summary,
    pub fallback: Summary,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryResponse {
    #[serde(rename = "totalRequests")]
    pub total_requests: u64,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PaymentSummaryResponse {
    pub default: SummaryResponse,
    pub fallback: SummaryResponse,
}

impl From<Summary> for SummaryResponse {
    fn from(summary: Summary) -> Self {
        Self {
            total_requests: summary.total_requests,
            total_amount: money::cents_to_decimal(summary.total_amount_cents),
        }
    }
}

impl From<PaymentSummary> for PaymentSummaryResponse {
    fn from(summary: PaymentSummary) -> Self {
        Self {
            default: summary.default.into(),
            fallback: summary.fallback.into(),
        }
    }
}
