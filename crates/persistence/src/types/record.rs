//! Stored record types.
//!
//! This module defines the [`StoredRecord`] type, which wraps a JSON document
//! with the metadata the REST layer needs for optimistic concurrency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A JSON document with persistence metadata.
///
/// - **Identity**: internal UUID, distinct from any PID value
/// - **Revision**: starts at 1 and increases by one on every mutation
/// - **Timestamps**: creation and last modification
/// - **Index**: the search index the record is visible in
///
/// # Examples
///
/// ```
/// use pidrest_persistence::types::StoredRecord;
/// use serde_json::json;
/// use uuid::Uuid;
///
/// let record = StoredRecord::new(Uuid::new_v4(), "records", json!({"title": "Dune"}));
/// assert_eq!(record.revision(), 1);
/// assert_eq!(record.etag(), "\"1\"");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    id: Uuid,
    index: String,
    revision: u64,
    payload: Value,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    deleted: bool,
}

impl StoredRecord {
    /// Creates a fresh record at revision 1.
    pub fn new(id: Uuid, index: impl Into<String>, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            index: index.into(),
            revision: 1,
            payload,
            created: now,
            updated: now,
            deleted: false,
        }
    }

    /// Creates a record from existing data (e.g., loaded from database).
    pub fn from_storage(
        id: Uuid,
        index: impl Into<String>,
        revision: u64,
        payload: Value,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        deleted: bool,
    ) -> Self {
        Self {
            id,
            index: index.into(),
            revision,
            payload,
            created,
            updated,
            deleted,
        }
    }

    /// Returns the internal id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the search index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Returns the current revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the document body.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the record and returns the document body.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Returns when the record was created.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Returns when the record was last modified.
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Returns true if the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns the strong entity tag for the current revision.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_record_starts_at_revision_one() {
        let record = StoredRecord::new(Uuid::new_v4(), "records", json!({"a": 1}));
        assert_eq!(record.revision(), 1);
        assert_eq!(record.created(), record.updated());
        assert!(!record.is_deleted());
        assert_eq!(record.index(), "records");
    }

    #[test]
    fn test_etag_is_quoted_revision() {
        let now = Utc::now();
        let record =
            StoredRecord::from_storage(Uuid::nil(), "records", 7, json!({}), now, now, false);
        assert_eq!(record.etag(), "\"7\"");
    }
}
