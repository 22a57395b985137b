use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::models::payment::{HealthCheckResponse, ProcessorPayload};

// Client HTTP compartilhado para os Payment Processors. Um pool só
// absorve os bursts de todos os workers sem esgotar sockets.
pub struct ProcessorClient {
    client: Client,
}

impl ProcessorClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    // Envia um pagamento; quem chama decide o que o status significa
    pub async fn send_payment(
        &self,
        url: &str,
        payload: &ProcessorPayload,
    ) -> Result<StatusCode, reqwest::Error> {
        let response = self.client.post(url).json(payload).send().await?;
        Ok(response.status())
    }

    // Saudável somente com 200 e failing == false no body; qualquer falha
    // de transporte, status ou decode conta como unhealthy
    pub async fn check_health(&self, health_url: &str) -> bool {
        let response = match self.client.get(health_url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("health probe failed for {}: {}", health_url, err);
                return false;
            }
        };

        if response.status() != StatusCode::OK {
            warn!(
                "health probe for {} returned status {}",
                health_url,
                response.status()
            );
            return false;
        }

        match response.json::<HealthCheckResponse>().await {
            Ok(body) => !body.failing,
            Err(err) => {
                warn!("undecodable health body from {}: {}", health_url, err);
                false
            }
        }
    }
}

impl Default for ProcessorClient {
    fn default() -> Self {
        Self::new()
    }
}
