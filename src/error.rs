//! Error types for EmberKV
//!
//! Provides a unified error type for all operations. Command-level failures
//! (unknown command, wrong arity, missing key) are not errors here: they are
//! error *replies* sent back to the client.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // AOF Errors
    // -------------------------------------------------------------------------
    #[error("AOF error: {0}")]
    Aof(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Internal Faults
    // -------------------------------------------------------------------------
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KvError {
    /// Build a protocol error quoting the offending input
    pub fn protocol(line: &[u8]) -> Self {
        KvError::Protocol(String::from_utf8_lossy(line).trim_end().to_string())
    }

    /// True when the underlying byte source reached end of stream
    pub fn is_eof(&self) -> bool {
        matches!(self, KvError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }

    /// True for faults of the underlying byte source (these end a stream)
    pub fn is_io(&self) -> bool {
        matches!(self, KvError::Io(_))
    }
}
