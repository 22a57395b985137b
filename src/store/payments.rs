use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::gateway::{BackendError, SharedStore};
use crate::models::payment::{Payment, PaymentSummary, Service, Summary};

pub const QUEUE_KEY: &str = "payments:queue";
pub const PAYMENTS_KEY: &str = "payments";
pub const HEALTH_STATUS_KEY: &str = "healthy_processor_status";
pub const HEALTH_LOCK_KEY: &str = "health_check_lock";
const PROCESSING_KEY_PREFIX: &str = "payments:processing:";

pub fn processing_key(worker: usize) -> String {
    format!("{}{}", PROCESSING_KEY_PREFIX, worker)
}

fn service_key(service: Service) -> String {
    format!("payments:{}", service.as_str())
}

// Membros precisam ser únicos por pagamento, senão o sorted set colapsa
// valores iguais numa entrada só. Por isso os centavos vêm prefixados no
// correlation id; um store repetido do mesmo pagamento sobrescreve o
// próprio membro em vez de contar duas vezes.
fn amount_member(payment: &Payment) -> String {
    format!("{}:{}", payment.amount, payment.correlation_id)
}

// Por serviço: faz o range da janela, extrai o prefixo de centavos de
// cada membro e responde {count, sum}. Uma ida só para o summary inteiro.
const SUMMARY_SCRIPT: &str = r#"
local function tally(key)
    local members = redis.call('ZRANGEBYSCORE', key, ARGV[1], ARGV[2])
    local count = 0
    local sum = 0
    for _, member in ipairs(members) do
        local cents = tonumber(string.match(member, '^(%d+)'))
        if cents then
            count = count + 1
            sum = sum + cents
        end
    end
    return {count, sum}
end
local d = tally(KEYS[1])
local f = tally(KEYS[2])
return {d[1], d[2], f[1], f[2]}
"#;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to encode payment record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct PaymentStore {
    backend: Arc<dyn SharedStore>,
}

impl PaymentStore {
    pub fn new(backend: Arc<dyn SharedStore>) -> Self {
        Self { backend }
    }

    pub async fn enqueue(&self, payload: &str) -> Result<(), BackendError> {
        self.backend.lpush(QUEUE_KEY, payload).await
    }

    // Reivindica atomicamente o próximo payload da fila de entrada para a
    // fila privada do worker; None = fila vazia
    pub async fn claim_next(&self, processing_key: &str) -> Result<Option<String>, BackendError> {
        self.backend.rpoplpush(QUEUE_KEY, processing_key).await
    }

    pub async fn release_claim(
        &self,
        processing_key: &str,
        payload: &str,
    ) -> Result<(), BackendError> {
        self.backend.lrem(processing_key, 1, payload).await
    }

    // Grava nas duas formas com o mesmo score em nanosegundos: o registro
    // JSON completo para auditoria e o membro só-de-valor para o summary
    pub async fn store_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let record = serde_json::to_string(payment)?;
        let score = payment
            .requested_at
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX);
        self.backend.zadd(PAYMENTS_KEY, score, &record).await?;
        self.backend
            .zadd(&service_key(payment.service), score, &amount_member(payment))
            .await?;
        Ok(())
    }

    pub async fn summary_by_time(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<PaymentSummary, StoreError> {
        let keys = vec![service_key(Service::Default), service_key(Service::Fallback)];
        let (min, max) = score_range(from, to);
        let reply = self
            .backend
            .eval(SUMMARY_SCRIPT, &keys, &[min, max])
            .await?;
        Ok(summary_from_reply(&reply))
    }

    // Leitura completa por janela de tempo; membro malformado é pulado,
    // não derruba a consulta
    pub async fn payments_by_time(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Payment>, StoreError> {
        let (min, max) = score_range(from, to);
        let members = self
            .backend
            .zrange_by_score(PAYMENTS_KEY, &min, &max)
            .await?;
        Ok(decode_payment_members(&members))
    }

    // Apaga tudo que foi gravado mais as filas privadas encontradas via
    // scan. A fila de entrada fica intacta.
    pub async fn purge_all(&self) -> Result<(), BackendError> {
        let mut keys = vec![
            PAYMENTS_KEY.to_string(),
            service_key(Service::Default),
            service_key(Service::Fallback),
        ];
        keys.extend(
            self.backend
                .scan_match(&format!("{}*", PROCESSING_KEY_PREFIX))
                .await?,
        );
        self.backend.del(&keys).await
    }
}

// Limites de score da janela: lados abertos viram (-inf, agora]; quando
// informados, os dois extremos são inclusivos
fn score_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> (String, String) {
    let min = match from {
        Some(from) => from.timestamp_nanos_opt().unwrap_or(i64::MIN).to_string(),
        None => "-inf".to_string(),
    };
    let max = match to {
        Some(to) => to.timestamp_nanos_opt().unwrap_or(i64::MAX).to_string(),
        None => Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX)
            .to_string(),
    };
    (min, max)
}

fn summary_from_reply(reply: &[i64]) -> PaymentSummary {
    let at = |index: usize| reply.get(index).copied().unwrap_or(0);
    PaymentSummary {
        default: Summary {
            total_requests: at(0).max(0) as u64,
            total_amount_cents: at(1),
        },
        fallback: Summary {
            total_requests: at(2).max(0) as u64,
            total_amount_cents: at(3),
        },
    }
}

fn decode_payment_members(members: &[String]) -> Vec<Payment> {
    members
        .iter()
        .filter_map(|member| match serde_json::from_str(member) {
            Ok(payment) => Some(payment),
            Err(err) => {
                warn!("skipping malformed stored payment: {}", err);
                None
            }
        })
        .collect()
}
