//! In-process search execution.
//!
//! Backends without a native search engine load the live documents of an
//! index and hand them to [`execute`] and [`complete`]:
//!
//! - [`query`] - query-string parser and matcher
//! - [`evaluate`] - filters, sorting and aggregations
//!
//! # Execution Order
//!
//! ```text
//! documents ── query ── filters ──┬── aggregations
//!                                 └── post_filters ── sort ── window
//! ```

pub mod evaluate;
pub mod query;

use serde_json::{Map, Value};

pub use query::QueryString;

use crate::error::SearchError;
use crate::types::{CompletionHit, CompletionQuery, SearchQuery, SearchResult, StoredRecord};

/// Runs a search over the given records, in insertion order.
///
/// Deleted records are skipped.
///
/// # Errors
///
/// Returns a [`SearchError`] if the query string or a filter is invalid.
pub fn execute(query: &SearchQuery, records: Vec<StoredRecord>) -> Result<SearchResult, SearchError> {
    let parsed = QueryString::parse(query.query.as_deref().unwrap_or_default())?;
    for filter in query.filters.iter().chain(&query.post_filters) {
        evaluate::validate_filter(filter)?;
    }

    let matched: Vec<StoredRecord> = records
        .into_iter()
        .filter(|r| !r.is_deleted())
        .filter(|r| parsed.matches(r.payload()))
        .filter(|r| query.filters.iter().all(|f| evaluate::matches_filter(r.payload(), f)))
        .collect();

    let mut aggregations = Map::new();
    if !query.aggregations.is_empty() {
        let docs: Vec<&Value> = matched.iter().map(StoredRecord::payload).collect();
        for (name, aggregation) in &query.aggregations {
            aggregations.insert(name.clone(), evaluate::aggregate(&docs, aggregation));
        }
    }

    let mut hits: Vec<StoredRecord> = matched
        .into_iter()
        .filter(|r| {
            query
                .post_filters
                .iter()
                .all(|f| evaluate::matches_filter(r.payload(), f))
        })
        .collect();
    if !query.sort.is_empty() {
        hits.sort_by(|a, b| evaluate::compare_documents(a.payload(), b.payload(), &query.sort));
    }

    let total = hits.len();
    let hits = hits
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();

    Ok(SearchResult {
        total,
        hits,
        aggregations,
    })
}

/// Collects completion options whose input starts with the query text.
///
/// Matching is case-insensitive; each record contributes at most one
/// option, and options are ordered by their text.
pub fn complete(query: &CompletionQuery, records: Vec<StoredRecord>) -> Vec<CompletionHit> {
    let prefix = query.text.to_lowercase();
    let mut hits: Vec<CompletionHit> = records
        .into_iter()
        .filter(|r| !r.is_deleted())
        .filter(|r| match &query.context {
            Some((field, value)) => evaluate::lookup(r.payload(), field)
                .into_iter()
                .filter_map(evaluate::leaf_text)
                .any(|text| text == *value),
            None => true,
        })
        .filter_map(|record| {
            let text = evaluate::completion_inputs(record.payload(), &query.field)
                .into_iter()
                .find(|input| input.to_lowercase().starts_with(&prefix))?;
            Some(CompletionHit { text, record })
        })
        .collect();

    hits.sort_by(|a, b| a.text.to_lowercase().cmp(&b.text.to_lowercase()));
    hits.truncate(query.size);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Aggregation, Filter, SortField};
    use serde_json::json;
    use uuid::Uuid;

    fn records() -> Vec<StoredRecord> {
        [
            json!({"title": "Back to the Future", "year": 2015, "stars": 4, "suggest_title": "Back to the Future"}),
            json!({"title": "Back to the Past", "year": 2042, "stars": 3, "suggest_title": "Back to the Past"}),
            json!({"title": "The Hitchhiker's Guide to the Galaxy", "year": 1985, "stars": 4}),
            json!({"title": "Unknown film", "year": 4242, "stars": 5}),
        ]
        .into_iter()
        .map(|payload| StoredRecord::new(Uuid::new_v4(), "records", payload))
        .collect()
    }

    #[test]
    fn test_execute_query_sort_and_window() {
        let query = SearchQuery::new("records")
            .with_query("back")
            .with_sort(SortField::parse("-year"))
            .with_window(0, 1);
        let result = execute(&query, records()).unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].payload()["title"], "Back to the Past");
    }

    #[test]
    fn test_post_filter_does_not_affect_aggregations() {
        let query = SearchQuery::new("records")
            .with_post_filter(Filter::Terms {
                field: "stars".to_string(),
                values: vec!["5".to_string()],
            })
            .with_aggregation(
                "stars",
                Aggregation::Terms {
                    field: "stars".to_string(),
                    size: None,
                },
            );
        let result = execute(&query, records()).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(
            result.aggregations["stars"]["buckets"].as_array().unwrap().len(),
            3
        );
    }

    #[test]
    fn test_execute_rejects_bad_query() {
        let query = SearchQuery::new("records").with_query("title:\"unterminated");
        assert!(matches!(
            execute(&query, records()),
            Err(SearchError::QueryParseError { .. })
        ));
    }

    #[test]
    fn test_complete_prefix() {
        let query = CompletionQuery {
            index: "records".to_string(),
            field: "suggest_title".to_string(),
            text: "back".to_string(),
            context: None,
            size: 5,
        };
        let hits = complete(&query, records());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Back to the Future");
    }
}
