//! Error types for ShelfDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ShelfError
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Unified error type for ShelfDB operations
#[derive(Debug, Error)]
pub enum ShelfError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure while loading or persisting a specific table
    #[error("Persistence error on table '{table}': {source}")]
    Persistence {
        table: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ShelfError {
    /// Attach a table name to an I/O failure
    pub(crate) fn persistence(table: &str, source: std::io::Error) -> Self {
        ShelfError::Persistence {
            table: table.to_string(),
            source,
        }
    }

    /// True for errors raised by input checks before any state change
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ShelfError::Validation(_) | ShelfError::Config(_))
    }
}

impl From<serde_json::Error> for ShelfError {
    fn from(err: serde_json::Error) -> Self {
        ShelfError::Serialization(err.to_string())
    }
}
