use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::app::config::Config;
use crate::models::payment::Service;
use crate::services::processor_client::ProcessorClient;
use crate::store::gateway::SharedStore;
use crate::store::payments::{HEALTH_LOCK_KEY, HEALTH_STATUS_KEY};

// Tick um pouco acima da janela de rate limit dos processors; o TTL do
// lock cobre um ciclo inteiro de probe, então um líder que morre não
// trava o cluster.
const HEALTH_TICK: Duration = Duration::from_secs(6);
const LOCK_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ProcessorEndpoint {
    pub url: String,
    pub health_url: String,
    pub service: Service,
}

impl ProcessorEndpoint {
    fn from_base(base: &str, service: Service) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            url: format!("{}/payments", base),
            health_url: format!("{}/payments/service-health", base),
            service,
        }
    }
}

// Mantém o cache local do "processor saudável" desta réplica. A cada
// tick uma réplica ganha o lock e faz os probes de verdade; as outras
// leem o resultado publicado no Redis.
pub struct HealthMonitor {
    backend: Arc<dyn SharedStore>,
    client: Arc<ProcessorClient>,
    default_endpoint: Arc<ProcessorEndpoint>,
    fallback_endpoint: Arc<ProcessorEndpoint>,
    healthy: RwLock<Arc<ProcessorEndpoint>>,
}

impl HealthMonitor {
    pub fn new(
        config: &Config,
        backend: Arc<dyn SharedStore>,
        client: Arc<ProcessorClient>,
    ) -> Self {
        let default_endpoint = Arc::new(ProcessorEndpoint::from_base(
            &config.default_processor_url,
            Service::Default,
        ));
        let fallback_endpoint = Arc::new(ProcessorEndpoint::from_base(
            &config.fallback_processor_url,
            Service::Fallback,
        ));

        Self {
            backend,
            client,
            healthy: RwLock::new(default_endpoint.clone()),
            default_endpoint,
            fallback_endpoint,
        }
    }

    // O endpoint que os workers devem usar agora. Cada caller leva seu
    // próprio Arc, então uma troca concorrente não rasga o endpoint.
    pub async fn current(&self) -> Arc<ProcessorEndpoint> {
        self.healthy.read().await.clone()
    }

    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(HEALTH_TICK);
        ticker.tick().await; // o primeiro tick dispara na hora
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    // Um ciclo de probe-ou-refresh; run chama isso na cadência
    // compartilhada. Quem ganha o lock faz o probe para todo mundo.
    pub async fn tick(&self) {
        match self.backend.set_nx(HEALTH_LOCK_KEY, "locked", LOCK_TTL).await {
            Ok(true) => {
                self.probe_and_publish().await;
                if let Err(err) = self.backend.del(&[HEALTH_LOCK_KEY.to_string()]).await {
                    warn!("failed to release health check lock: {}", err);
                }
            }
            Ok(false) => self.refresh_from_shared().await,
            Err(err) => warn!("skipping health tick: {}", err),
        }
    }

    // Branch do líder: tenta o default primeiro, depois o fallback; se os
    // dois caírem mantém o atual, e publica o resultado
    async fn probe_and_publish(&self) {
        let chosen = if self.client.check_health(&self.default_endpoint.health_url).await {
            self.default_endpoint.clone()
        } else if self.client.check_health(&self.fallback_endpoint.health_url).await {
            self.fallback_endpoint.clone()
        } else {
            let current = self.current().await;
            warn!(
                "both processors are down, keeping {}",
                current.service.as_str()
            );
            current
        };

        let service = chosen.service;
        self.set_current(chosen).await;
        self.publish(service).await;
    }

    // Branch do follower: adota o que o líder publicou. Sem registro,
    // mantém o cache como está.
    async fn refresh_from_shared(&self) {
        let status = match self.backend.hget_all(HEALTH_STATUS_KEY).await {
            Ok(status) => status,
            Err(err) => {
                warn!("failed to read shared health status: {}", err);
                return;
            }
        };
        if status.is_empty() {
            return;
        }

        let endpoint = match status.get("service").map(String::as_str) {
            Some("default") => self.default_endpoint.clone(),
            Some("fallback") => self.fallback_endpoint.clone(),
            other => {
                warn!("ignoring unknown shared health status {:?}", other);
                return;
            }
        };
        self.set_current(endpoint).await;
    }

    async fn set_current(&self, endpoint: Arc<ProcessorEndpoint>) {
        let mut healthy = self.healthy.write().await;
        if healthy.service != endpoint.service {
            info!("switching healthy processor to {}", endpoint.service.as_str());
        }
        *healthy = endpoint;
    }

    async fn publish(&self, service: Service) {
        if let Err(err) = self
            .backend
            .hset(HEALTH_STATUS_KEY, "service", service.as_str())
            .await
        {
            warn!("failed to publish health hint: {}", err);
            return;
        }
        let stamp = Utc::now().timestamp().to_string();
        if let Err(err) = self.backend.hset(HEALTH_STATUS_KEY, "timestamp", &stamp).await {
            warn!("failed to publish health hint timestamp: {}", err);
        }
    }
}
