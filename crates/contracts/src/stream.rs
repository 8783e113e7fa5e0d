//! StreamSource trait - line-oriented data stream abstraction
//!
//! Each source wraps exactly one stream and owns no cross-stream knowledge.
//! End-of-stream is a normal terminal signal, not an error.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Stream kind (fixes the field layout of its rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// `x,y,z`
    Accelerometer,
    /// `lon,lat`
    Gps,
    /// `emptyCount,lon,lat`
    Parking,
}

impl StreamKind {
    /// All kinds, in aggregate order
    pub const ALL: [StreamKind; 3] = [Self::Accelerometer, Self::Gps, Self::Parking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accelerometer => "accelerometer",
            Self::Gps => "gps",
            Self::Parking => "parking",
        }
    }

    /// Column names of one row, in file order
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Accelerometer => &["x", "y", "z"],
            Self::Gps => &["lon", "lat"],
            Self::Parking => &["emptyCount", "lon", "lat"],
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed line of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data row index since the last (re)open (header excluded)
    pub line: u64,

    /// Comma-separated fields, in file order
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }
}

/// Result of pulling one record from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Next row
    Record(RawRow),
    /// No more bytes remain
    EndOfStream,
}

/// Line-oriented data source
///
/// Implemented by file-backed sources and by in-memory sources used in tests.
///
/// # Contract
///
/// 1. `open` positions the source at its first data row, discarding the header row
///    when the source is header-prefixed. Calling `open` on an already open source
///    restarts it from the beginning.
/// 2. `next_record` returns `ReadOutcome::EndOfStream` when exhausted; genuine I/O
///    faults are errors.
/// 3. `close` is idempotent.
pub trait StreamSource: Send {
    /// Stream name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Stream kind
    fn kind(&self) -> StreamKind;

    /// Open (or reopen) the stream
    ///
    /// # Errors
    /// `ContractError::StreamOpen` if the underlying stream is unavailable
    fn open(&mut self) -> Result<(), ContractError>;

    /// Pull the next record
    fn next_record(&mut self) -> Result<ReadOutcome, ContractError>;

    /// Release the underlying handle
    fn close(&mut self);

    /// Check if currently open
    fn is_open(&self) -> bool;
}
