//! Error types for the persistence layer.
//!
//! This module defines all error types used by the collaborator contracts,
//! following a hierarchy that separates identifier errors, record errors,
//! concurrency errors, search errors and transaction errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;
use uuid::Uuid;

use crate::types::PidStatus;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Persistent identifier errors
    #[error(transparent)]
    Pid(#[from] PidError),

    /// Record state errors
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Concurrency and revision errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Search operation errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised by the PID registry, minters and fetchers.
#[derive(Error, Debug)]
pub enum PidError {
    /// No identifier with this type and value exists.
    #[error("pid does not exist: {pid_type}:{pid_value}")]
    DoesNotExist { pid_type: String, pid_value: String },

    /// An identifier with this type and value already exists.
    #[error("pid already exists: {pid_type}:{pid_value}")]
    AlreadyExists { pid_type: String, pid_value: String },

    /// The requested status change is not allowed (e.g. leaving DELETED).
    #[error("invalid status transition for {pid_type}:{pid_value}: {from} -> {to}")]
    InvalidStatusTransition {
        pid_type: String,
        pid_value: String,
        from: PidStatus,
        to: PidStatus,
    },

    /// The document already carries the field a minter would assign.
    #[error("field '{field}' is assigned by the {minter} minter")]
    PresetValue { minter: String, field: String },

    /// A fetcher could not find the identifier field in a document.
    #[error("field '{field}' missing from record {object_uuid}")]
    MissingValue { field: String, object_uuid: Uuid },
}

/// Errors related to record state.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The requested record was not found.
    #[error("record not found: {id}")]
    NotFound { id: Uuid },

    /// A record with the given id already exists.
    #[error("record already exists: {id}")]
    AlreadyExists { id: Uuid },

    /// The record has been deleted.
    #[error("record deleted: {id}")]
    Gone { id: Uuid },
}

/// Errors related to optimistic concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The record changed between read and write.
    #[error("revision conflict on {id}: expected {expected}, found {actual}")]
    RevisionConflict { id: Uuid, expected: u64, actual: u64 },
}

/// Errors related to search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The query string could not be parsed.
    #[error("failed to parse query: {message}")]
    QueryParseError { message: String },

    /// A filter definition or value is invalid.
    #[error("invalid filter on '{field}': {message}")]
    InvalidFilter { field: String, message: String },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },

    /// The transaction was already committed or rolled back.
    #[error("transaction is no longer active")]
    InvalidTransaction,
}

/// Backend-specific errors.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Stored data could not be (de)serialized.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
