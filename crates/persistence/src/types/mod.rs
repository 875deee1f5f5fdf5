//! Core types for the persistence layer.
//!
//! - [`PersistentIdentifier`], [`PidRef`], [`PidStatus`] - identifier records
//! - [`StoredRecord`] - a JSON document with revision metadata
//! - [`SearchQuery`], [`SearchResult`], [`CompletionQuery`] - search contract
//!
//! # Examples
//!
//! ```
//! use pidrest_persistence::types::{PersistentIdentifier, PidStatus};
//! use uuid::Uuid;
//!
//! let pid = PersistentIdentifier::registered("recid", "1", Uuid::new_v4());
//! assert_eq!(pid.status(), PidStatus::Registered);
//! ```

mod pid;
mod record;
mod search;

pub use pid::{PersistentIdentifier, PidRef, PidStatus, RECORD_OBJECT_TYPE};
pub use record::StoredRecord;
pub use search::{
    Aggregation, CompletionHit, CompletionQuery, Filter, RangeBound, SearchQuery, SearchResult,
    SortField,
};
