//! HttpForwarder - one POST per batch to the store's ingress

use contracts::{
    BatchForwarder, ClassifiedReading, ContractError, ForwarderConfig, PersistedRecord,
    ProcessedReading,
};
use tracing::{debug, instrument};

/// Ingress path, relative to the store's root URL
pub const INGRESS_PATH: &str = "/processed_agent_data/";

/// Forwarder that POSTs each batch as a JSON array
///
/// No internal retry: a failed request is returned to the caller as `Transport`.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    url: String,
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Build a forwarder with the configured request timeout
    pub fn new(config: &ForwarderConfig) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ContractError::transport(&config.endpoint, None, e.to_string()))?;
        Ok(Self::with_client(&config.endpoint, client))
    }

    /// Build a forwarder around an existing client
    pub fn with_client(endpoint: &str, client: reqwest::Client) -> Self {
        Self {
            url: format!("{}{}", endpoint.trim_end_matches('/'), INGRESS_PATH),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, status: Option<u16>, message: impl Into<String>) -> ContractError {
        ContractError::transport(&self.url, status, message)
    }
}

impl BatchForwarder for HttpForwarder {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(name = "http_forward", skip(self, batch), fields(url = %self.url, batch_size = batch.len()))]
    async fn forward(
        &self,
        batch: &[ClassifiedReading],
    ) -> Result<Vec<PersistedRecord>, ContractError> {
        let body: Vec<ProcessedReading> = batch.iter().map(ProcessedReading::from).collect();

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.transport_error(Some(status.as_u16()), text));
        }

        let persisted: Vec<PersistedRecord> = response.json().await.map_err(|e| {
            self.transport_error(Some(status.as_u16()), format!("invalid response body: {e}"))
        })?;

        debug!(status = status.as_u16(), persisted = persisted.len(), "Batch accepted");
        Ok(persisted)
    }
}
