//! Transaction support.
//!
//! A [`Transaction`] is an explicit unit of work: every write a request
//! performs goes through one, and either all of them become visible on
//! [`Transaction::commit`] or none do. Dropping an active transaction rolls
//! it back.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::types::{PersistentIdentifier, PidRef, StoredRecord};

/// A unit of work over identifiers and records.
///
/// # Example
///
/// ```ignore
/// let mut tx = store.begin_transaction().await?;
/// let record = tx.create_record(id, "records", payload).await?;
/// tx.create_pid(&PersistentIdentifier::registered("recid", "1", id)).await?;
/// tx.commit().await?;
/// ```
#[async_trait]
pub trait Transaction: Send {
    /// Returns the next value of a named sequence, starting at 1.
    async fn next_sequence_value(&mut self, sequence: &str) -> StorageResult<u64>;

    /// Inserts a new identifier.
    ///
    /// # Errors
    ///
    /// * `StorageError::Pid(AlreadyExists)` - if the pair is taken
    async fn create_pid(&mut self, pid: &PersistentIdentifier) -> StorageResult<()>;

    /// Points an existing identifier at another one.
    ///
    /// # Errors
    ///
    /// * `StorageError::Pid(DoesNotExist)` - if `pid` is unknown
    /// * `StorageError::Pid(InvalidStatusTransition)` - if `pid` is deleted
    async fn redirect_pid(&mut self, pid: &PidRef, target: &PidRef) -> StorageResult<()>;

    /// Marks every identifier bound to `object_uuid` as deleted.
    ///
    /// Returns the identifiers that changed status.
    async fn delete_pids_for_object(&mut self, object_uuid: Uuid) -> StorageResult<Vec<PidRef>>;

    /// Creates a record at revision 1.
    async fn create_record(
        &mut self,
        id: Uuid,
        index: &str,
        payload: Value,
    ) -> StorageResult<StoredRecord>;

    /// Replaces the payload if the record is still at `expected_revision`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Concurrency(RevisionConflict)` - on a stale revision
    /// * `StorageError::Record(NotFound | Gone)` - if the record is absent or deleted
    async fn update_record(
        &mut self,
        id: Uuid,
        expected_revision: u64,
        payload: Value,
    ) -> StorageResult<StoredRecord>;

    /// Soft-deletes the record if it is still at `expected_revision`.
    async fn delete_record(&mut self, id: Uuid, expected_revision: u64)
    -> StorageResult<StoredRecord>;

    /// Returns whether the transaction can still be used.
    fn is_active(&self) -> bool;

    /// Makes every write visible.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Discards every write.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}

/// Starts transactions.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// Begins a new transaction.
    async fn begin_transaction(&self) -> StorageResult<Box<dyn Transaction>>;
}
