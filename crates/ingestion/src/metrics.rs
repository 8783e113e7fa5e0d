//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
///
/// Shared between the multi-stream reader and whoever reports on it.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Aggregate rows successfully assembled
    pub rows_read: AtomicU64,

    /// Resync attempts
    pub resyncs: AtomicU64,

    /// Rows rejected by the row mapper
    pub malformed_rows: AtomicU64,

    /// Cycles ended by an exhausted stream
    pub exhausted: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record aggregate row read
    pub fn record_row(&self) {
        self.rows_read.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("roadwatch_rows_read_total").increment(1);
    }

    /// Record resync
    pub fn record_resync(&self) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("roadwatch_resyncs_total").increment(1);
    }

    /// Record malformed row
    pub fn record_malformed(&self, stream: &str) {
        self.malformed_rows.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("roadwatch_malformed_rows_total", "stream" => stream.to_string())
            .increment(1);
    }

    /// Record exhausted stream
    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("roadwatch_streams_exhausted_total").increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            malformed_rows: self.malformed_rows.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rows_read: u64,
    pub resyncs: u64,
    pub malformed_rows: u64,
    pub exhausted: u64,
}
