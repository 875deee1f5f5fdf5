//! Search implementation for SQLite backend.
//!
//! Live documents of an index are loaded in insertion order and evaluated
//! in process by [`crate::search`].

use async_trait::async_trait;
use rusqlite::params;

use crate::core::SearchProvider;
use crate::error::StorageResult;
use crate::search;
use crate::types::{CompletionHit, CompletionQuery, SearchQuery, SearchResult, StoredRecord};

use super::SqliteBackend;
use super::storage::{RECORD_COLUMNS, RecordRow, internal_error};

impl SqliteBackend {
    fn load_index(&self, index: &str) -> StorageResult<Vec<StoredRecord>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records
             WHERE index_name = ?1 AND is_deleted = 0
             ORDER BY rowid"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare search query: {}", e)))?;
        let rows = stmt
            .query_map(params![index], RecordRow::read)
            .map_err(|e| internal_error(format!("Failed to execute search: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| internal_error(format!("Failed to read row: {}", e)))?;
            records.push(row.into_record()?);
        }
        Ok(records)
    }
}

#[async_trait]
impl SearchProvider for SqliteBackend {
    async fn search(&self, query: &SearchQuery) -> StorageResult<SearchResult> {
        let records = self.load_index(&query.index)?;
        let result = search::execute(query, records)?;

        tracing::debug!(
            index = %query.index,
            total = result.total,
            returned = result.hits.len(),
            "Search executed"
        );
        Ok(result)
    }

    async fn suggest(&self, query: &CompletionQuery) -> StorageResult<Vec<CompletionHit>> {
        let records = self.load_index(&query.index)?;
        Ok(search::complete(query, records))
    }
}
