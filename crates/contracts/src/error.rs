//! Layered error definitions
//!
//! Categorized by source: config / stream / transport / persist

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Stream Errors =====
    /// Stream could not be opened
    #[error("failed to open stream '{stream}': {source}")]
    StreamOpen {
        stream: String,
        #[source]
        source: std::io::Error,
    },

    /// Stream read fault (not end-of-stream)
    #[error("read error on stream '{stream}': {message}")]
    StreamRead { stream: String, message: String },

    /// A field of one row could not be parsed; aborts only the current aggregate
    #[error("malformed record in stream '{stream}', field '{field}' = {value:?}: {message}")]
    MalformedRecord {
        stream: String,
        field: String,
        value: String,
        message: String,
    },

    /// A stream stayed exhausted after the resync attempt
    #[error("stream '{stream}' exhausted after resync")]
    StreamExhausted { stream: String },

    // ===== Transport Errors =====
    /// Batch forwarding failed
    #[error("transport error to '{endpoint}' (status {status:?}): {message}")]
    Transport {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    // ===== Persist Errors =====
    /// Batch transaction rolled back, nothing stored
    #[error("persist failure: {message}")]
    Persist { message: String },

    /// Record lookup miss
    #[error("record {id} not found")]
    NotFound { id: i64 },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create stream read error
    pub fn stream_read(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamRead {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create malformed record error
    pub fn malformed(
        stream: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedRecord {
            stream: stream.into(),
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(
        endpoint: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Create persist failure
    pub fn persist(message: impl Into<String>) -> Self {
        Self::Persist {
            message: message.into(),
        }
    }

    /// Row-scoped errors leave the reader usable for the next cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}
