//! Read-side trait implementations and row mapping for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::core::{PidRegistry, RecordStorage};
use crate::error::{BackendError, RecordError, StorageError, StorageResult};
use crate::types::{PersistentIdentifier, PidRef, PidStatus, StoredRecord};

use super::SqliteBackend;

pub(super) const PID_COLUMNS: &str =
    "pid_type, pid_value, status, object_type, object_uuid, redirect_type, redirect_value";

pub(super) const RECORD_COLUMNS: &str =
    "id, index_name, revision, payload, created, updated, is_deleted";

pub(super) fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

pub(super) fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

/// Raw pid row, decoded outside the rusqlite closure so errors map cleanly.
pub(super) struct PidRow {
    pid_type: String,
    pid_value: String,
    status: String,
    object_type: Option<String>,
    object_uuid: Option<String>,
    redirect_type: Option<String>,
    redirect_value: Option<String>,
}

impl PidRow {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            pid_type: row.get(0)?,
            pid_value: row.get(1)?,
            status: row.get(2)?,
            object_type: row.get(3)?,
            object_uuid: row.get(4)?,
            redirect_type: row.get(5)?,
            redirect_value: row.get(6)?,
        })
    }

    pub(super) fn into_pid(self) -> StorageResult<PersistentIdentifier> {
        let status = PidStatus::from_code(&self.status).ok_or_else(|| {
            serialization_error(format!(
                "Unknown status code '{}' for {}:{}",
                self.status, self.pid_type, self.pid_value
            ))
        })?;
        let object_uuid = self.object_uuid.as_deref().map(parse_uuid).transpose()?;
        let redirect = match (self.redirect_type, self.redirect_value) {
            (Some(t), Some(v)) => Some(PidRef::new(t, v)),
            _ => None,
        };
        Ok(PersistentIdentifier::from_storage(
            self.pid_type,
            self.pid_value,
            status,
            self.object_type,
            object_uuid,
            redirect,
        ))
    }
}

/// Raw record row.
pub(super) struct RecordRow {
    id: String,
    index: String,
    revision: i64,
    payload: String,
    created: String,
    updated: String,
    is_deleted: bool,
}

impl RecordRow {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            index: row.get(1)?,
            revision: row.get(2)?,
            payload: row.get(3)?,
            created: row.get(4)?,
            updated: row.get(5)?,
            is_deleted: row.get::<_, i64>(6)? != 0,
        })
    }

    pub(super) fn into_record(self) -> StorageResult<StoredRecord> {
        let payload = serde_json::from_str(&self.payload).map_err(|e| {
            serialization_error(format!("Failed to deserialize record {}: {}", self.id, e))
        })?;
        Ok(StoredRecord::from_storage(
            parse_uuid(&self.id)?,
            self.index,
            u64::try_from(self.revision).unwrap_or_default(),
            payload,
            parse_timestamp(&self.created)?,
            parse_timestamp(&self.updated)?,
            self.is_deleted,
        ))
    }
}

pub(super) fn parse_uuid(value: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| serialization_error(format!("Invalid uuid '{}': {}", value, e)))
}

pub(super) fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| serialization_error(format!("Invalid timestamp '{}': {}", value, e)))
}

pub(super) fn select_pid(
    conn: &Connection,
    pid_type: &str,
    pid_value: &str,
) -> StorageResult<Option<PersistentIdentifier>> {
    let sql = format!("SELECT {PID_COLUMNS} FROM pids WHERE pid_type = ?1 AND pid_value = ?2");
    conn.query_row(&sql, params![pid_type, pid_value], PidRow::read)
        .optional()
        .map_err(|e| internal_error(format!("Failed to read pid: {}", e)))?
        .map(PidRow::into_pid)
        .transpose()
}

pub(super) fn select_record(conn: &Connection, id: Uuid) -> StorageResult<Option<StoredRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], RecordRow::read)
        .optional()
        .map_err(|e| internal_error(format!("Failed to read record: {}", e)))?
        .map(RecordRow::into_record)
        .transpose()
}

#[async_trait]
impl PidRegistry for SqliteBackend {
    async fn get_pid(
        &self,
        pid_type: &str,
        pid_value: &str,
    ) -> StorageResult<Option<PersistentIdentifier>> {
        let conn = self.get_connection()?;
        select_pid(&conn, pid_type, pid_value)
    }

    async fn pids_for_object(&self, object_uuid: Uuid) -> StorageResult<Vec<PersistentIdentifier>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {PID_COLUMNS} FROM pids WHERE object_uuid = ?1 ORDER BY created, rowid"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
        let rows = stmt
            .query_map(params![object_uuid.to_string()], PidRow::read)
            .map_err(|e| internal_error(format!("Failed to query pids: {}", e)))?;

        let mut pids = Vec::new();
        for row in rows {
            let row = row.map_err(|e| internal_error(format!("Failed to read pid row: {}", e)))?;
            pids.push(row.into_pid()?);
        }
        Ok(pids)
    }
}

#[async_trait]
impl RecordStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn read_record(&self, id: Uuid) -> StorageResult<StoredRecord> {
        let conn = self.get_connection()?;
        select_record(&conn, id)?.ok_or(StorageError::Record(RecordError::NotFound { id }))
    }

    async fn record_revisions(&self, id: Uuid) -> StorageResult<Vec<StoredRecord>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM record_revisions WHERE id = ?1 ORDER BY revision"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
        let rows = stmt
            .query_map(params![id.to_string()], RecordRow::read)
            .map_err(|e| internal_error(format!("Failed to query revisions: {}", e)))?;

        let mut revisions = Vec::new();
        for row in rows {
            let row =
                row.map_err(|e| internal_error(format!("Failed to read revision row: {}", e)))?;
            revisions.push(row.into_record()?);
        }
        Ok(revisions)
    }
}
