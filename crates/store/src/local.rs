//! LocalForwarder - in-process BatchForwarder
//!
//! Calls `IngestionService::ingest` directly. A persist failure is surfaced as
//! `Transport`, so callers see the same contract as over HTTP.

use std::sync::Arc;

use contracts::{BatchForwarder, ClassifiedReading, ContractError, PersistedRecord, RecordStore};

use crate::service::IngestionService;

pub struct LocalForwarder<S> {
    service: Arc<IngestionService<S>>,
}

impl<S> LocalForwarder<S> {
    pub fn new(service: Arc<IngestionService<S>>) -> Self {
        Self { service }
    }
}

impl<S> Clone for LocalForwarder<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<S: RecordStore + Send + Sync> BatchForwarder for LocalForwarder<S> {
    fn name(&self) -> &str {
        "local"
    }

    async fn forward(
        &self,
        batch: &[ClassifiedReading],
    ) -> Result<Vec<PersistedRecord>, ContractError> {
        self.service
            .ingest_classified(batch)
            .await
            .map_err(|e| ContractError::transport("local", None, e.to_string()))
    }
}
