//! Transaction support for SQLite backend.

use async_trait::async_trait;
use chrono::Utc;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use serde_json::Value;
use uuid::Uuid;

use crate::core::{Transaction, TransactionProvider};
use crate::error::{
    ConcurrencyError, PidError, RecordError, StorageError, StorageResult, TransactionError,
};
use crate::types::{PersistentIdentifier, PidRef, PidStatus, StoredRecord};

use super::SqliteBackend;
use super::storage::{
    PID_COLUMNS, PidRow, internal_error, select_pid, select_record, serialization_error,
};

/// A SQLite transaction.
///
/// Holds one pooled connection for its whole lifetime. Dropping an active
/// transaction rolls it back.
pub struct SqliteTransaction {
    conn: PooledConnection<SqliteConnectionManager>,
    active: bool,
}

impl std::fmt::Debug for SqliteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("active", &self.active)
            .finish()
    }
}

impl SqliteTransaction {
    fn new(conn: PooledConnection<SqliteConnectionManager>) -> StorageResult<Self> {
        conn.execute("BEGIN IMMEDIATE", []).map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Failed to begin transaction: {}", e),
            })
        })?;

        Ok(Self { conn, active: true })
    }

    fn ensure_active(&self) -> StorageResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(StorageError::Transaction(
                TransactionError::InvalidTransaction,
            ))
        }
    }

    /// Loads a live record and checks its revision.
    fn guarded_record(&self, id: Uuid, expected_revision: u64) -> StorageResult<StoredRecord> {
        let record = select_record(&self.conn, id)?
            .ok_or(StorageError::Record(RecordError::NotFound { id }))?;
        if record.is_deleted() {
            return Err(StorageError::Record(RecordError::Gone { id }));
        }
        if record.revision() != expected_revision {
            return Err(StorageError::Concurrency(
                ConcurrencyError::RevisionConflict {
                    id,
                    expected: expected_revision,
                    actual: record.revision(),
                },
            ));
        }
        Ok(record)
    }

    /// Appends a written record to the revision history.
    fn archive_revision(&self, record: &StoredRecord, data: &str) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT INTO record_revisions
                     (id, index_name, revision, payload, created, updated, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id().to_string(),
                    record.index(),
                    record.revision() as i64,
                    data,
                    record.created().to_rfc3339(),
                    record.updated().to_rfc3339(),
                    record.is_deleted() as i64
                ],
            )
            .map_err(|e| internal_error(format!("Failed to archive revision: {}", e)))?;
        Ok(())
    }

    fn write_record(
        &self,
        current: &StoredRecord,
        payload: Value,
        deleted: bool,
    ) -> StorageResult<StoredRecord> {
        let id = current.id();
        let data = serde_json::to_string(&payload)
            .map_err(|e| serialization_error(format!("Failed to serialize record: {}", e)))?;
        let now = Utc::now();
        let revision = current.revision() + 1;

        let changed = self
            .conn
            .execute(
                "UPDATE records SET payload = ?1, revision = ?2, updated = ?3, is_deleted = ?4
                 WHERE id = ?5 AND revision = ?6",
                params![
                    data,
                    revision as i64,
                    now.to_rfc3339(),
                    deleted as i64,
                    id.to_string(),
                    current.revision() as i64
                ],
            )
            .map_err(|e| internal_error(format!("Failed to update record: {}", e)))?;
        if changed == 0 {
            return Err(StorageError::Concurrency(
                ConcurrencyError::RevisionConflict {
                    id,
                    expected: current.revision(),
                    actual: current.revision() + 1,
                },
            ));
        }

        let record = StoredRecord::from_storage(
            id,
            current.index(),
            revision,
            payload,
            current.created(),
            now,
            deleted,
        );
        self.archive_revision(&record, &data)?;
        Ok(record)
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn next_sequence_value(&mut self, sequence: &str) -> StorageResult<u64> {
        self.ensure_active()?;

        self.conn
            .execute(
                "INSERT INTO sequences (name, value) VALUES (?1, 1)
                 ON CONFLICT(name) DO UPDATE SET value = value + 1",
                params![sequence],
            )
            .map_err(|e| internal_error(format!("Failed to advance sequence: {}", e)))?;
        let value: i64 = self
            .conn
            .query_row(
                "SELECT value FROM sequences WHERE name = ?1",
                params![sequence],
                |row| row.get(0),
            )
            .map_err(|e| internal_error(format!("Failed to read sequence: {}", e)))?;

        Ok(u64::try_from(value).unwrap_or_default())
    }

    async fn create_pid(&mut self, pid: &PersistentIdentifier) -> StorageResult<()> {
        self.ensure_active()?;

        if select_pid(&self.conn, pid.pid_type(), pid.pid_value())?.is_some() {
            return Err(StorageError::Pid(PidError::AlreadyExists {
                pid_type: pid.pid_type().to_string(),
                pid_value: pid.pid_value().to_string(),
            }));
        }

        let now = Utc::now().to_rfc3339();
        let redirect = pid.redirect();
        self.conn
            .execute(
                "INSERT INTO pids (pid_type, pid_value, status, object_type, object_uuid,
                                   redirect_type, redirect_value, created, updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    pid.pid_type(),
                    pid.pid_value(),
                    pid.status().code(),
                    pid.object_type(),
                    pid.object_uuid().map(|u| u.to_string()),
                    redirect.map(|r| r.pid_type.as_str()),
                    redirect.map(|r| r.pid_value.as_str()),
                    now
                ],
            )
            .map_err(|e| internal_error(format!("Failed to insert pid: {}", e)))?;

        tracing::debug!(pid = %pid, status = %pid.status(), "Created pid");
        Ok(())
    }

    async fn redirect_pid(&mut self, pid: &PidRef, target: &PidRef) -> StorageResult<()> {
        self.ensure_active()?;

        let current = select_pid(&self.conn, &pid.pid_type, &pid.pid_value)?.ok_or_else(|| {
            StorageError::Pid(PidError::DoesNotExist {
                pid_type: pid.pid_type.clone(),
                pid_value: pid.pid_value.clone(),
            })
        })?;
        if select_pid(&self.conn, &target.pid_type, &target.pid_value)?.is_none() {
            return Err(StorageError::Pid(PidError::DoesNotExist {
                pid_type: target.pid_type.clone(),
                pid_value: target.pid_value.clone(),
            }));
        }
        if !current.status().can_transition_to(PidStatus::Redirected) {
            return Err(StorageError::Pid(PidError::InvalidStatusTransition {
                pid_type: pid.pid_type.clone(),
                pid_value: pid.pid_value.clone(),
                from: current.status(),
                to: PidStatus::Redirected,
            }));
        }

        self.conn
            .execute(
                "UPDATE pids SET status = ?1, object_type = NULL, object_uuid = NULL,
                 redirect_type = ?2, redirect_value = ?3, updated = ?4
                 WHERE pid_type = ?5 AND pid_value = ?6",
                params![
                    PidStatus::Redirected.code(),
                    target.pid_type,
                    target.pid_value,
                    Utc::now().to_rfc3339(),
                    pid.pid_type,
                    pid.pid_value
                ],
            )
            .map_err(|e| internal_error(format!("Failed to redirect pid: {}", e)))?;

        tracing::debug!(pid = %pid, target = %target, "Redirected pid");
        Ok(())
    }

    async fn delete_pids_for_object(&mut self, object_uuid: Uuid) -> StorageResult<Vec<PidRef>> {
        self.ensure_active()?;

        let sql = format!(
            "SELECT {PID_COLUMNS} FROM pids WHERE object_uuid = ?1 AND status != ?2 ORDER BY rowid"
        );
        let rows: Vec<PidRow> = {
            let mut stmt = self
                .conn
                .prepare(&sql)
                .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
            stmt.query_map(
                params![object_uuid.to_string(), PidStatus::Deleted.code()],
                PidRow::read,
            )
            .map_err(|e| internal_error(format!("Failed to query pids: {}", e)))?
            .collect::<Result<_, _>>()
            .map_err(|e| internal_error(format!("Failed to read pid row: {}", e)))?
        };

        let now = Utc::now().to_rfc3339();
        let mut deleted = Vec::with_capacity(rows.len());
        for row in rows {
            let pid = row.into_pid()?;
            self.conn
                .execute(
                    "UPDATE pids SET status = ?1, updated = ?2 WHERE pid_type = ?3 AND pid_value = ?4",
                    params![
                        PidStatus::Deleted.code(),
                        now,
                        pid.pid_type(),
                        pid.pid_value()
                    ],
                )
                .map_err(|e| internal_error(format!("Failed to delete pid: {}", e)))?;
            deleted.push(pid.to_ref());
        }

        Ok(deleted)
    }

    async fn create_record(
        &mut self,
        id: Uuid,
        index: &str,
        payload: Value,
    ) -> StorageResult<StoredRecord> {
        self.ensure_active()?;

        if select_record(&self.conn, id)?.is_some() {
            return Err(StorageError::Record(RecordError::AlreadyExists { id }));
        }

        let data = serde_json::to_string(&payload)
            .map_err(|e| serialization_error(format!("Failed to serialize record: {}", e)))?;
        let record = StoredRecord::new(id, index, payload);
        self.conn
            .execute(
                "INSERT INTO records (id, index_name, revision, payload, created, updated, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![
                    id.to_string(),
                    index,
                    record.revision() as i64,
                    data,
                    record.created().to_rfc3339(),
                    record.updated().to_rfc3339()
                ],
            )
            .map_err(|e| internal_error(format!("Failed to insert record: {}", e)))?;
        self.archive_revision(&record, &data)?;

        Ok(record)
    }

    async fn update_record(
        &mut self,
        id: Uuid,
        expected_revision: u64,
        payload: Value,
    ) -> StorageResult<StoredRecord> {
        self.ensure_active()?;
        let current = self.guarded_record(id, expected_revision)?;
        self.write_record(&current, payload, false)
    }

    async fn delete_record(
        &mut self,
        id: Uuid,
        expected_revision: u64,
    ) -> StorageResult<StoredRecord> {
        self.ensure_active()?;
        let current = self.guarded_record(id, expected_revision)?;
        let payload = current.payload().clone();
        self.write_record(&current, payload, true)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;

        self.conn.execute("COMMIT", []).map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Commit failed: {}", e),
            })
        })?;

        self.active = false;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.ensure_active()?;

        self.conn.execute("ROLLBACK", []).map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Rollback failed: {}", e),
            })
        })?;

        self.active = false;
        Ok(())
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.conn.execute("ROLLBACK", []) {
                tracing::warn!(error = %e, "Failed to roll back dropped transaction");
            }
        }
    }
}

#[async_trait]
impl TransactionProvider for SqliteBackend {
    async fn begin_transaction(&self) -> StorageResult<Box<dyn Transaction>> {
        let conn = self.get_connection()?;
        Ok(Box::new(SqliteTransaction::new(conn)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PidRegistry, RecordStorage};
    use serde_json::json;

    fn create_test_backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let backend = create_test_backend();
        let id = Uuid::new_v4();

        let mut tx = backend.begin_transaction().await.unwrap();
        tx.create_record(id, "records", json!({"title": "Back to the Future"}))
            .await
            .unwrap();
        tx.create_pid(&PersistentIdentifier::registered("recid", "1", id))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let record = backend.read_record(id).await.unwrap();
        assert_eq!(record.revision(), 1);
        assert!(backend.get_pid("recid", "1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let backend = create_test_backend();
        let id = Uuid::new_v4();

        let mut tx = backend.begin_transaction().await.unwrap();
        tx.create_record(id, "records", json!({})).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(matches!(
            backend.read_record(id).await,
            Err(StorageError::Record(RecordError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_transaction_auto_rollback_on_drop() {
        let backend = create_test_backend();
        let id = Uuid::new_v4();

        {
            let mut tx = backend.begin_transaction().await.unwrap();
            tx.create_record(id, "records", json!({})).await.unwrap();
            assert!(tx.is_active());
        }

        assert!(backend.read_record(id).await.is_err());
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let backend = create_test_backend();
        let mut tx = backend.begin_transaction().await.unwrap();
        assert_eq!(tx.next_sequence_value("recid").await.unwrap(), 1);
        assert_eq!(tx.next_sequence_value("recid").await.unwrap(), 2);
        assert_eq!(tx.next_sequence_value("other").await.unwrap(), 1);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_checks_revision() {
        let backend = create_test_backend();
        let id = Uuid::new_v4();

        let mut tx = backend.begin_transaction().await.unwrap();
        tx.create_record(id, "records", json!({"year": 2015}))
            .await
            .unwrap();
        let updated = tx
            .update_record(id, 1, json!({"year": 1985}))
            .await
            .unwrap();
        assert_eq!(updated.revision(), 2);

        let err = tx
            .update_record(id, 1, json!({"year": 2042}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Concurrency(ConcurrencyError::RevisionConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_record_and_pids() {
        let backend = create_test_backend();
        let id = Uuid::new_v4();

        let mut tx = backend.begin_transaction().await.unwrap();
        tx.create_record(id, "records", json!({})).await.unwrap();
        tx.create_pid(&PersistentIdentifier::registered("recid", "1", id))
            .await
            .unwrap();
        tx.create_pid(&PersistentIdentifier::registered("doi", "10.1/x", id))
            .await
            .unwrap();
        let deleted = tx.delete_record(id, 1).await.unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(deleted.revision(), 2);
        let pids = tx.delete_pids_for_object(id).await.unwrap();
        assert_eq!(pids.len(), 2);
        tx.commit().await.unwrap();

        let pid = backend.get_pid("doi", "10.1/x").await.unwrap().unwrap();
        assert_eq!(pid.status(), PidStatus::Deleted);
        assert!(backend.read_record(id).await.unwrap().is_deleted());
    }

    #[tokio::test]
    async fn test_redirect_rules() {
        let backend = create_test_backend();
        let id = Uuid::new_v4();

        let mut tx = backend.begin_transaction().await.unwrap();
        tx.create_pid(&PersistentIdentifier::registered("recid", "1", id))
            .await
            .unwrap();
        tx.create_pid(&PersistentIdentifier::registered("recid", "2", id))
            .await
            .unwrap();
        tx.redirect_pid(&PidRef::new("recid", "2"), &PidRef::new("recid", "1"))
            .await
            .unwrap();

        let missing = tx
            .redirect_pid(&PidRef::new("recid", "9"), &PidRef::new("recid", "1"))
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            StorageError::Pid(PidError::DoesNotExist { .. })
        ));

        let duplicate = tx
            .create_pid(&PersistentIdentifier::reserved("recid", "1"))
            .await
            .unwrap_err();
        assert!(matches!(
            duplicate,
            StorageError::Pid(PidError::AlreadyExists { .. })
        ));
        tx.commit().await.unwrap();

        let redirected = backend.get_pid("recid", "2").await.unwrap().unwrap();
        assert_eq!(redirected.status(), PidStatus::Redirected);
        assert_eq!(redirected.redirect(), Some(&PidRef::new("recid", "1")));
        assert_eq!(redirected.object_uuid(), None);
        assert_eq!(redirected.object_type(), None);
    }

    #[tokio::test]
    async fn test_redirect_survives_object_deletion() {
        let backend = create_test_backend();
        let id = Uuid::new_v4();

        let mut tx = backend.begin_transaction().await.unwrap();
        tx.create_pid(&PersistentIdentifier::registered("recid", "1", id))
            .await
            .unwrap();
        tx.create_pid(&PersistentIdentifier::registered("recid", "2", id))
            .await
            .unwrap();
        tx.redirect_pid(&PidRef::new("recid", "2"), &PidRef::new("recid", "1"))
            .await
            .unwrap();
        let deleted = tx.delete_pids_for_object(id).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(deleted, vec![PidRef::new("recid", "1")]);
        let alias = backend.get_pid("recid", "2").await.unwrap().unwrap();
        assert_eq!(alias.status(), PidStatus::Redirected);
    }
}
