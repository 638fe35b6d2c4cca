//! Typed error hierarchy for casedesk.
//!
//! Two top-level enums cover the two layers that callers branch on:
//! - `BackendError`: table, object-storage and change-feed failures
//! - `OfficeError`: validation failures in the office services (contact
//!   form, gallery, admin lists) wrapped around backend failures

use thiserror::Error;

/// Errors from the storage collaborator (tables, buckets, change feed).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Storage error for {bucket}/{path}: {source}")]
    Storage {
        bucket: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the office services built on top of the backend.
#[derive(Debug, Error)]
pub enum OfficeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Attachment too large: {size} bytes (limit {limit})")]
    AttachmentTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
