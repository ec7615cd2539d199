//! Error types for sirepkit
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::network::SessionState;

/// Result type alias using SirepError
pub type Result<T> = std::result::Result<T, SirepError>;

/// Unified error type for Sirep client operations
#[derive(Debug, Error)]
pub enum SirepError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Exchange Errors (abort the whole exchange)
    // -------------------------------------------------------------------------
    #[error("Connection to {addr} failed: {source}")]
    ConnectionFailure {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Handshake failed: received {received} of {expected} banner bytes")]
    HandshakeFailure {
        received: usize,
        expected: usize,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Send failed after {written} of {total} bytes: {source}")]
    SendFailure {
        written: usize,
        total: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    // -------------------------------------------------------------------------
    // Record Errors (abort the record loop, earlier results are kept)
    // -------------------------------------------------------------------------
    #[error("Truncated record #{index}: {field} needs {expected} bytes, got {received}")]
    TruncatedRecord {
        index: usize,
        field: &'static str,
        expected: usize,
        received: usize,
    },

    #[error("Unknown result type 0x{code:08x} in record #{index}")]
    UnknownResultType { index: usize, code: u32 },

    #[error(
        "Malformed field {field}{}: needs {needed} bytes at offset {offset}, payload has {available}",
        record_suffix(.index)
    )]
    MalformedField {
        /// Record position, known once the payload came off a stream
        index: Option<usize>,
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SirepError {
    /// Attach the stream position to a payload-level error
    pub fn at_record(self, record: usize) -> Self {
        match self {
            SirepError::MalformedField {
                index: None,
                field,
                offset,
                needed,
                available,
            } => SirepError::MalformedField {
                index: Some(record),
                field,
                offset,
                needed,
                available,
            },
            other => other,
        }
    }
}

fn record_suffix(index: &Option<usize>) -> String {
    match index {
        Some(index) => format!(" in record #{}", index),
        None => String::new(),
    }
}
