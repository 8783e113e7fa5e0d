//! AgentLoop - sequential read → classify → batch → forward loop
//!
//! One loop per agent instance, no internal concurrency. Each aggregate read runs on
//! the blocking pool under `read_timeout`; a read that does not resolve in time ends
//! the cycle, since the reader cannot be recovered from the stuck thread.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    BatchForwarder, ClassifiedReading, ContractError, RoadwatchBlueprint, SensorReading,
};
use ingestion::IngestionMetrics;
use observability::{AgentMetricsAggregator, StatsSummary};
use sync_engine::MultiStreamReader;
use tracing::{debug, error, info, instrument, warn};

use crate::batch::BatchBuffer;
use crate::classifier::SurfaceClassifier;
use crate::retry::{forward_with_retry, RetryPolicy};

/// Loop timing and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSettings {
    /// Pause between aggregate reads
    pub read_interval: Duration,
    /// Bounded wait for one aggregate read
    pub read_timeout: Duration,
    /// Readings per batch
    pub batch_size: usize,
    /// Stop after this many readings (0 = unlimited)
    pub max_rows: u64,
    pub retry: RetryPolicy,
}

impl AgentSettings {
    pub fn from_blueprint(blueprint: &RoadwatchBlueprint) -> Self {
        Self {
            read_interval: blueprint.agent.read_interval(),
            read_timeout: blueprint.agent.read_timeout(),
            batch_size: blueprint.agent.batch_size,
            max_rows: blueprint.agent.max_rows,
            retry: RetryPolicy::from_config(&blueprint.forwarder),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            read_interval: Duration::from_millis(100),
            read_timeout: Duration::from_secs(2),
            batch_size: 5,
            max_rows: 0,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `max_rows` readings were produced
    MaxRows,
    /// Shutdown signal
    Shutdown,
    /// A stream stayed exhausted after resync
    StreamExhausted,
    /// An aggregate read did not finish within `read_timeout`
    ReadTimeout,
    /// Stream could not be opened or read
    StreamError,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MaxRows => "max rows reached",
            Self::Shutdown => "shutdown requested",
            Self::StreamExhausted => "stream exhausted",
            Self::ReadTimeout => "read timed out",
            Self::StreamError => "stream error",
        };
        f.write_str(s)
    }
}

/// Run summary
#[derive(Debug, Clone)]
pub struct AgentReport {
    pub rows_read: u64,
    pub malformed_rows: u64,
    pub resyncs: u64,
    pub batches_forwarded: u64,
    pub batches_failed: u64,
    pub records_persisted: u64,
    pub smooth: u64,
    pub bumpy: u64,
    pub terminated_by: Termination,
    pub duration: Duration,
    pub forward_latency_ms: StatsSummary,
}

enum ReadFailure {
    /// Only the current row is lost
    Row(ContractError),
    /// The cycle is over
    Fatal(Termination, ContractError),
}

/// The edge agent loop
pub struct AgentLoop<F> {
    reader: Option<MultiStreamReader>,
    classifier: SurfaceClassifier,
    buffer: BatchBuffer,
    forwarder: F,
    settings: AgentSettings,
    ingestion: Arc<IngestionMetrics>,
    aggregator: AgentMetricsAggregator,
    rows_read: u64,
}

impl<F> AgentLoop<F>
where
    F: BatchForwarder + Sync,
{
    pub fn new(
        reader: MultiStreamReader,
        classifier: SurfaceClassifier,
        forwarder: F,
        settings: AgentSettings,
    ) -> Self {
        let ingestion = reader.metrics().clone();
        Self {
            reader: Some(reader),
            classifier,
            buffer: BatchBuffer::new(settings.batch_size),
            forwarder,
            settings,
            ingestion,
            aggregator: AgentMetricsAggregator::new(),
            rows_read: 0,
        }
    }

    /// Run until a termination condition, then flush the partial batch
    #[instrument(
        name = "agent_run",
        skip(self, shutdown),
        fields(forwarder = self.forwarder.name(), batch_size = self.settings.batch_size)
    )]
    pub async fn run(mut self, shutdown: impl Future<Output = ()> + Send) -> AgentReport {
        let started = Instant::now();
        tokio::pin!(shutdown);
        info!("Agent loop started");

        let mut delay = Duration::ZERO;
        let terminated_by = loop {
            if self.settings.max_rows > 0 && self.rows_read >= self.settings.max_rows {
                break Termination::MaxRows;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break Termination::Shutdown,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.settings.read_interval;

            match self.read_one().await {
                Ok(reading) => self.handle_reading(reading).await,
                Err(ReadFailure::Row(e)) => {
                    warn!(error = %e, "Skipping malformed row");
                }
                Err(ReadFailure::Fatal(termination, e)) => {
                    error!(error = %e, reason = %termination, "Ingestion cycle ended");
                    break termination;
                }
            }
        };

        let rest = self.buffer.take();
        if !rest.is_empty() {
            debug!(pending = rest.len(), "Flushing partial batch");
            self.forward_batch(rest).await;
        }
        if let Some(reader) = self.reader.as_mut() {
            reader.close();
        }

        let report = self.report(terminated_by, started.elapsed());
        info!(
            rows = report.rows_read,
            batches = report.batches_forwarded,
            failed = report.batches_failed,
            reason = %terminated_by,
            "Agent loop stopped"
        );
        report
    }

    async fn handle_reading(&mut self, reading: SensorReading) {
        self.rows_read += 1;
        let classified = self.classifier.classify_reading(reading);
        self.aggregator.update_reading(classified.surface_state);

        if let Some(batch) = self.buffer.push(classified) {
            self.forward_batch(batch).await;
        }
    }

    /// One aggregate read on the blocking pool
    async fn read_one(&mut self) -> Result<SensorReading, ReadFailure> {
        let Some(mut reader) = self.reader.take() else {
            return Err(ReadFailure::Fatal(
                Termination::StreamError,
                ContractError::Other("reader lost after an earlier timeout".into()),
            ));
        };

        let task = tokio::task::spawn_blocking(move || {
            let result = reader.read_aggregate();
            (reader, result)
        });

        match tokio::time::timeout(self.settings.read_timeout, task).await {
            Ok(Ok((reader, result))) => {
                self.reader = Some(reader);
                result.map_err(|e| match e {
                    ContractError::MalformedRecord { .. } => ReadFailure::Row(e),
                    ContractError::StreamExhausted { .. } => {
                        ReadFailure::Fatal(Termination::StreamExhausted, e)
                    }
                    other => ReadFailure::Fatal(Termination::StreamError, other),
                })
            }
            Ok(Err(join_error)) => Err(ReadFailure::Fatal(
                Termination::StreamError,
                ContractError::Other(format!("reader task failed: {join_error}")),
            )),
            Err(_) => Err(ReadFailure::Fatal(
                Termination::ReadTimeout,
                ContractError::stream_read(
                    "aggregate",
                    format!(
                        "read did not finish within {} ms",
                        self.settings.read_timeout.as_millis()
                    ),
                ),
            )),
        }
    }

    #[instrument(name = "agent_forward_batch", skip(self, batch), fields(batch_size = batch.len()))]
    async fn forward_batch(&mut self, batch: Vec<ClassifiedReading>) {
        let started = Instant::now();
        let outcome = forward_with_retry(&self.forwarder, &batch, &self.settings.retry).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome.result {
            Ok(persisted) => {
                info!(
                    persisted = persisted.len(),
                    attempts = outcome.attempts,
                    "Batch forwarded"
                );
                self.aggregator
                    .update_forward(Some(persisted.len()), outcome.attempts, latency_ms);
            }
            Err(e) => {
                error!(
                    error = %e,
                    attempts = outcome.attempts,
                    dropped = batch.len(),
                    "Batch dropped after retries"
                );
                self.aggregator
                    .update_forward(None, outcome.attempts, latency_ms);
            }
        }
    }

    fn report(&self, terminated_by: Termination, duration: Duration) -> AgentReport {
        let ingestion = self.ingestion.snapshot();
        let summary = self.aggregator.summary();
        AgentReport {
            rows_read: self.rows_read,
            malformed_rows: ingestion.malformed_rows,
            resyncs: ingestion.resyncs,
            batches_forwarded: summary.batches_forwarded,
            batches_failed: summary.batches_failed,
            records_persisted: summary.records_persisted,
            smooth: summary.smooth,
            bumpy: summary.bumpy,
            terminated_by,
            duration,
            forward_latency_ms: summary.forward_latency_ms,
        }
    }
}
