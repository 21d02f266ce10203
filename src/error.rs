//! Error types for pmemkv
//!
//! Provides a unified error type for configuration and engine operations,
//! and its mapping onto the status codes returned across the C boundary.

use thiserror::Error;

use crate::status::Status;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for pmemkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Call Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Failed(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Config parsing error: {0}")]
    ConfigParsing(String),

    #[error("Config type error: {0}")]
    ConfigType(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Out of space: need {needed} bytes, capacity is {capacity}")]
    OutOfSpace { needed: u64, capacity: u64 },

    #[error("Pool corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl KvError {
    /// Status code reported for this error across the C boundary
    pub fn status(&self) -> Status {
        match self {
            KvError::NotFound(_) => Status::NotFound,
            KvError::InvalidArgument(_) => Status::InvalidArgument,
            KvError::ConfigParsing(_) => Status::ConfigParsingError,
            KvError::ConfigType(_) => Status::ConfigTypeError,
            KvError::Io(_)
            | KvError::Failed(_)
            | KvError::OutOfSpace { .. }
            | KvError::Corruption(_)
            | KvError::Serialization(_) => Status::Failed,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        KvError::NotFound(what.into())
    }

    pub(crate) fn failed(msg: impl Into<String>) -> Self {
        KvError::Failed(msg.into())
    }
}

impl From<bincode::Error> for KvError {
    fn from(err: bincode::Error) -> Self {
        KvError::Serialization(err.to_string())
    }
}
