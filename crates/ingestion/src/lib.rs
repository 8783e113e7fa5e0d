//! # Ingestion
//!
//! Line-oriented stream sources.
//!
//! Responsibilities:
//! - File-backed CSV sources (`CsvStreamSource`), restartable from the first data row
//! - In-memory sources for tests and demos (`MemoryStreamSource`)
//! - Ingestion counters shared with the multi-stream reader
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{ReadOutcome, StreamKind, StreamSource};
//! use ingestion::CsvStreamSource;
//!
//! let mut source = CsvStreamSource::new(StreamKind::Gps, "data/gps.csv", true);
//! source.open()?;
//! while let ReadOutcome::Record(row) = source.next_record()? {
//!     println!("{}: {:?}", row.line, row.fields);
//! }
//! ```

mod csv_source;
mod memory;
mod metrics;

pub use csv_source::CsvStreamSource;
pub use memory::{MemoryStreamHandle, MemoryStreamSource};
pub use metrics::{IngestionMetrics, MetricsSnapshot};

use contracts::{StreamKind, StreamPaths};

/// Build the three file sources described by a config section
///
/// Returned in aggregate order: accelerometer, GPS, parking.
pub fn csv_sources(paths: &StreamPaths) -> [CsvStreamSource; 3] {
    StreamKind::ALL.map(|kind| CsvStreamSource::new(kind, paths.path(kind), paths.has_headers))
}
