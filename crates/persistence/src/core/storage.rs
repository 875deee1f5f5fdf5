//! Core read-side storage traits.
//!
//! This module defines [`PidRegistry`] and [`RecordStorage`], the read
//! contracts the REST layer uses to resolve identifiers. All writes go
//! through a [`Transaction`](super::Transaction).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::types::{PersistentIdentifier, StoredRecord};

/// Read access to persistent identifiers.
///
/// # Example
///
/// ```ignore
/// use pidrest_persistence::core::PidRegistry;
///
/// async fn example<R: PidRegistry>(registry: &R) -> StorageResult<()> {
///     if let Some(pid) = registry.get_pid("recid", "1").await? {
///         println!("{} is {}", pid, pid.status());
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait PidRegistry: Send + Sync {
    /// Looks up an identifier by type and value.
    ///
    /// Returns `Ok(None)` when no identifier exists. Identifiers in every
    /// status are returned, including deleted ones.
    async fn get_pid(
        &self,
        pid_type: &str,
        pid_value: &str,
    ) -> StorageResult<Option<PersistentIdentifier>>;

    /// Returns every identifier bound to an object, in any status.
    async fn pids_for_object(&self, object_uuid: Uuid) -> StorageResult<Vec<PersistentIdentifier>>;
}

/// Read access to stored records.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Reads a record by its internal id.
    ///
    /// Soft-deleted records are returned with [`StoredRecord::is_deleted`] set.
    ///
    /// # Errors
    ///
    /// * `StorageError::Record(NotFound)` - if no record has this id
    /// * `StorageError::Backend` - on backend failure
    async fn read_record(&self, id: Uuid) -> StorageResult<StoredRecord>;

    /// Returns every stored revision of a record, oldest first.
    ///
    /// The soft delete is a revision too. Unknown ids yield an empty list.
    async fn record_revisions(&self, id: Uuid) -> StorageResult<Vec<StoredRecord>>;
}
