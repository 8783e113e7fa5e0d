//! Pipeline orchestrator - wires the components of each role.
//!
//! The agent role runs the sequential reader → classifier → forwarder loop.
//! The store role owns the database, the broadcaster, and the HTTP server.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use broadcaster::Broadcaster;
use contracts::{RoadwatchBlueprint, StoreConfig, StreamSource};
use edge::{AgentLoop, AgentSettings, HttpForwarder, SurfaceClassifier};
use ingestion::csv_sources;
use store::{AppState, IngestionService, SqliteRecordStore};
use sync_engine::MultiStreamReader;
use tokio::net::TcpListener;
use tracing::info;

use super::PipelineStats;
use crate::error::CliError;

/// Edge agent: three CSV streams to the store over HTTP
pub struct AgentPipeline {
    blueprint: RoadwatchBlueprint,
}

impl AgentPipeline {
    pub fn new(blueprint: RoadwatchBlueprint) -> Self {
        Self { blueprint }
    }

    /// Run until the streams are exhausted, `max_rows`, or `shutdown`
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.blueprint;

        let sources = csv_sources(&blueprint.agent.streams);
        for source in &sources {
            info!(stream = %source.kind(), path = %source.path().display(), "Input stream");
        }
        let [accelerometer, gps, parking] = sources;
        let mut reader =
            MultiStreamReader::new(Box::new(accelerometer), Box::new(gps), Box::new(parking));
        reader.open().context("Failed to open input streams")?;
        info!("Input streams opened");

        let forwarder =
            HttpForwarder::new(&blueprint.forwarder).context("Failed to build HTTP client")?;
        info!(url = %forwarder.url(), "Forwarding batches");

        let agent = AgentLoop::new(
            reader,
            SurfaceClassifier::from_config(&blueprint.classifier),
            forwarder,
            AgentSettings::from_blueprint(blueprint),
        );
        let report = agent.run(shutdown).await;

        Ok(PipelineStats {
            report,
            duration: start_time.elapsed(),
        })
    }
}

/// Store: persistence, broadcaster, and HTTP API bound to a listener
pub struct StorePipeline {
    listener: TcpListener,
    state: AppState,
}

impl StorePipeline {
    /// Open the database and bind the listen address
    pub async fn start(config: &StoreConfig) -> Result<Self, CliError> {
        let store = SqliteRecordStore::open(&config.database_url, config.max_connections)
            .await
            .map_err(|e| CliError::store_startup(e.to_string()))?;
        let broadcaster = Broadcaster::new(config.subscriber_queue_capacity);
        let service = Arc::new(IngestionService::new(store, broadcaster));

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|e| CliError::Bind {
                address: config.listen_addr.clone(),
                source: e,
            })?;

        info!(
            database = %config.database_url,
            queue_capacity = config.subscriber_queue_capacity,
            "Store ready"
        );
        Ok(Self {
            listener,
            state: AppState::new(service),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown`, then close the database
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let service = self.state.service.clone();
        store::serve(self.listener, self.state, shutdown)
            .await
            .map_err(CliError::from)?;

        let stored = service.count().await.unwrap_or_default();
        info!(records = stored, "Closing record store");
        service.store().close().await;
        Ok(())
    }
}
