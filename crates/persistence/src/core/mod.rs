//! Core storage traits and abstractions.
//!
//! This module provides the collaborator contracts the REST layer is written
//! against:
//!
//! - [`PidRegistry`] - identifier lookup
//! - [`RecordStorage`] - record reads
//! - [`SearchProvider`] - search and completion
//! - [`Transaction`] / [`TransactionProvider`] - unit of work for all writes
//! - [`PidMinter`] / [`PidFetcher`] - identifier allocation and recovery
//!
//! # Trait Hierarchy
//!
//! ```text
//! RecordStore
//!     ├── PidRegistry
//!     ├── RecordStorage
//!     ├── SearchProvider
//!     └── TransactionProvider
//! ```

mod minter;
mod search;
mod storage;
mod transaction;

pub use minter::{
    PidFetcher, PidMinter, RECID_FIELD, RECID_PID_TYPE, RecidFetcher, RecidMinter,
};
pub use search::SearchProvider;
pub use storage::{PidRegistry, RecordStorage};
pub use transaction::{Transaction, TransactionProvider};

/// Everything a REST endpoint needs from a backend.
///
/// Implemented automatically for any type providing the four contracts.
pub trait RecordStore:
    PidRegistry + RecordStorage + SearchProvider + TransactionProvider + 'static
{
}

impl<T> RecordStore for T where
    T: PidRegistry + RecordStorage + SearchProvider + TransactionProvider + 'static
{
}
