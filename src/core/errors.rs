//! Error types for flatstore
//!
//! Every failure the store, the query language or the import path can
//! produce is one variant of [`StoreError`]. None of them are retried
//! internally.

use thiserror::Error;

/// Errors that can occur during datastore operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Datastore unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to write to datastore: {0}")]
    StoreWriteFailed(String),

    #[error("Unknown query command: {0}")]
    UnknownCommand(String),

    #[error("Empty query")]
    EmptyQuery,

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Cannot execute query: {0}")]
    MissingSelect(String),

    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    #[error("Invalid group specification: {0}")]
    InvalidGroupSpec(String),

    #[error("Field {0} is not one of the select specifiers")]
    FieldNotSelected(String),

    #[error("Unable to authenticate client {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidFieldValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for datastore operations
pub type Result<T> = std::result::Result<T, StoreError>;
