//! Persistence layer for the PID-addressed record store.
//!
//! This crate provides the storage side of the record REST service: a
//! registry of persistent identifiers (PIDs), a revisioned record store,
//! in-process search, and the transactions that tie them together.
//!
//! # Architecture
//!
//! - [`types`] - identifiers, stored records, search requests and results
//! - [`error`] - error types for all operations
//! - [`core`] - collaborator traits and the record-id minter
//! - [`search`] - query-string parsing and in-process evaluation
//! - [`backends`] - backend implementations (SQLite)
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! # Quick Start
//!
//! ```
//! use pidrest_persistence::types::{PersistentIdentifier, PidStatus, StoredRecord};
//! use serde_json::json;
//! use uuid::Uuid;
//!
//! let id = Uuid::new_v4();
//! let record = StoredRecord::new(id, "records", json!({"title": "Back to the Future"}));
//! let pid = PersistentIdentifier::registered("recid", "1", id);
//!
//! assert_eq!(record.revision(), 1);
//! assert_eq!(record.etag(), "\"1\"");
//! assert_eq!(pid.status(), PidStatus::Registered);
//! assert_eq!(pid.object_uuid(), Some(id));
//! ```
//!
//! # Identifier Lifecycle
//!
//! ```text
//! RESERVED ──► REGISTERED ──► REDIRECTED
//!     │             │              │
//!     └─────────────┴──────────────┴──► DELETED (terminal)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod search;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use types::{PersistentIdentifier, PidRef, PidStatus, SearchQuery, StoredRecord};

// Re-export core traits
pub use core::{
    PidFetcher, PidMinter, PidRegistry, RecordStorage, RecordStore, SearchProvider, Transaction,
    TransactionProvider,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
