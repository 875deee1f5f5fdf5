//! Search provider trait.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{CompletionHit, CompletionQuery, SearchQuery, SearchResult};

/// Executes composed search requests against an index.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs a search.
    ///
    /// Deleted records are never returned.
    ///
    /// # Errors
    ///
    /// * `StorageError::Search(QueryParseError)` - if the query string is invalid
    /// * `StorageError::Search(InvalidFilter)` - if a filter cannot be evaluated
    async fn search(&self, query: &SearchQuery) -> StorageResult<SearchResult>;

    /// Returns completion options whose input starts with the query text.
    async fn suggest(&self, query: &CompletionQuery) -> StorageResult<Vec<CompletionHit>>;
}
