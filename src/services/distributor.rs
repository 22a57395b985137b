use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::models::payment::{Payment, ProcessorPayload, QueuedPayment};
use crate::services::health_monitor::HealthMonitor;
use crate::services::processor_client::ProcessorClient;
use crate::store::payments::{processing_key, PaymentStore};
use crate::utils::money;

const IDLE_POLL: Duration = Duration::from_millis(200);
const BACKEND_RETRY: Duration = Duration::from_millis(500);

// Pool de workers que drena a fila de entrada compartilhada. Cada worker
// tem uma fila privada de in-flight com o próprio índice na chave, então
// um claim que morre junto com a réplica continua lá para recuperação.
pub struct Distributor {
    store: PaymentStore,
    health: Arc<HealthMonitor>,
    client: Arc<ProcessorClient>,
}

impl Distributor {
    pub fn new(
        store: PaymentStore,
        health: Arc<HealthMonitor>,
        client: Arc<ProcessorClient>,
    ) -> Self {
        Self {
            store,
            health,
            client,
        }
    }

    // Índices estáveis entre restarts: a réplica reinicia e reusa as
    // mesmas filas privadas
    pub fn spawn_workers(self: Arc<Self>, workers: usize) {
        for index in 0..workers {
            let distributor = self.clone();
            tokio::spawn(async move { distributor.worker_loop(index).await });
        }
        info!("started {} payment workers", workers);
    }

    async fn worker_loop(&self, index: usize) {
        let processing_key = processing_key(index);
        loop {
            match self.store.claim_next(&processing_key).await {
                Ok(Some(raw)) => self.handle_claim(&processing_key, &raw).await,
                Ok(None) => sleep(IDLE_POLL).await,
                Err(err) => {
                    warn!("worker {} failed to claim from intake: {}", index, err);
                    sleep(BACKEND_RETRY).await;
                }
            }
        }
    }

    async fn handle_claim(&self, processing_key: &str, raw: &str) {
        let queued: QueuedPayment = match serde_json::from_str(raw) {
            Ok(queued) => queued,
            Err(err) => {
                // Payload corrompido: descartar é melhor que ficar em loop
                error!("discarding unparseable queue entry: {}", err);
                self.drop_claim(processing_key, raw).await;
                return;
            }
        };

        let requested_at = queued.requested_at.unwrap_or_else(Utc::now);

        let target = self.health.current().await;
        let payload = ProcessorPayload {
            correlation_id: queued.correlation_id,
            amount: money::cents_to_decimal(queued.amount),
            requested_at,
        };

        match self.client.send_payment(&target.url, &payload).await {
            Ok(status) if status.is_success() => {
                let payment = Payment {
                    correlation_id: queued.correlation_id,
                    amount: queued.amount,
                    service: target.service,
                    requested_at,
                };
                if let Err(err) = self.store.store_payment(&payment).await {
                    // O processor já aceitou a cobrança; reprocessar seria
                    // cobrança dupla, então o claim sai da fila mesmo assim
                    error!(
                        "payment {} accepted by {} but not recorded: {}",
                        payment.correlation_id,
                        target.service.as_str(),
                        err
                    );
                }
                self.drop_claim(processing_key, raw).await;
            }
            Ok(status) if status == StatusCode::TOO_MANY_REQUESTS => {
                // TODO: tentar o outro processor uma vez antes de
                // reenfileirar no 429; hoje sempre reenfileira
                self.requeue_claim(processing_key, raw).await;
            }
            Ok(status) => {
                warn!(
                    "processor {} rejected payment {} with status {}",
                    target.service.as_str(),
                    queued.correlation_id,
                    status
                );
                self.requeue_claim(processing_key, raw).await;
            }
            Err(err) => {
                warn!(
                    "failed to reach processor {}: {}",
                    target.service.as_str(),
                    err
                );
                self.requeue_claim(processing_key, raw).await;
            }
        }
    }

    // Devolve o claim para a fila de entrada e só então limpa a fila
    // privada. Se o requeue falhar, o claim fica in-flight para
    // recuperação em vez de se perder.
    async fn requeue_claim(&self, processing_key: &str, raw: &str) {
        if let Err(err) = self.store.enqueue(raw).await {
            warn!("failed to requeue payment: {}", err);
            return;
        }
        self.drop_claim(processing_key, raw).await;
    }

    async fn drop_claim(&self, processing_key: &str, raw: &str) {
        if let Err(err) = self.store.release_claim(processing_key, raw).await {
            warn!("failed to clear claim from {}: {}", processing_key, err);
        }
    }
}
