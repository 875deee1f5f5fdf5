//! Search request and result types.
//!
//! These types form the contract between the REST layer, which composes a
//! request from URL parameters, and a [`SearchProvider`](crate::core::SearchProvider),
//! which executes it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StoredRecord;

/// One end of a range filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBound {
    /// Boundary value as given in the request.
    pub value: String,
    /// Whether the boundary itself matches.
    pub inclusive: bool,
}

impl RangeBound {
    /// Inclusive bound (`gte` / `lte`).
    pub fn inclusive(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    /// Exclusive bound (`gt` / `lt`).
    pub fn exclusive(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

/// A filter clause applied to documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Field equals any of the values.
    Terms {
        /// Dotted field path.
        field: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// Field falls within the bounds.
    Range {
        /// Dotted field path.
        field: String,
        /// Lower bound, if any.
        lower: Option<RangeBound>,
        /// Upper bound, if any.
        upper: Option<RangeBound>,
    },
}

/// A named aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregation {
    /// Bucket documents by the distinct values of a field.
    Terms {
        /// Dotted field path.
        field: String,
        /// Maximum number of buckets (default 10).
        size: Option<usize>,
    },
}

/// A sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Dotted field path. `_score` keeps the natural order.
    pub field: String,
    /// Ascending when true.
    pub ascending: bool,
}

impl SortField {
    /// Parses `field` or `-field`.
    pub fn parse(field: &str) -> Self {
        match field.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                ascending: false,
            },
            None => Self {
                field: field.to_string(),
                ascending: true,
            },
        }
    }

    /// Returns the same field in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            field: self.field.clone(),
            ascending: !self.ascending,
        }
    }
}

/// A fully composed search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Index to search.
    pub index: String,
    /// Query string; `None` or blank matches everything.
    pub query: Option<String>,
    /// Filters restricting hits and aggregations.
    pub filters: Vec<Filter>,
    /// Filters restricting hits only.
    pub post_filters: Vec<Filter>,
    /// Aggregations computed over the filtered documents.
    pub aggregations: Vec<(String, Aggregation)>,
    /// Sort criteria, in priority order.
    pub sort: Vec<SortField>,
    /// Number of hits to skip.
    pub offset: usize,
    /// Maximum number of hits to return.
    pub limit: usize,
}

impl SearchQuery {
    /// Creates a match-all query on an index.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            limit: 10,
            ..Default::default()
        }
    }

    /// Sets the query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Adds a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds a post filter.
    pub fn with_post_filter(mut self, filter: Filter) -> Self {
        self.post_filters.push(filter);
        self
    }

    /// Adds a named aggregation.
    pub fn with_aggregation(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        self.aggregations.push((name.into(), agg));
        self
    }

    /// Adds a sort criterion.
    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// Sets the window of hits to return.
    pub fn with_window(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// The outcome of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Total number of matching documents, ignoring the window.
    pub total: usize,
    /// The requested window of hits.
    pub hits: Vec<StoredRecord>,
    /// Aggregation results keyed by name.
    pub aggregations: Map<String, Value>,
}

/// A completion (type-ahead) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionQuery {
    /// Index to search.
    pub index: String,
    /// Field holding completion inputs.
    pub field: String,
    /// Prefix typed by the user.
    pub text: String,
    /// Optional `(field, value)` context restriction.
    pub context: Option<(String, String)>,
    /// Maximum number of options.
    pub size: usize,
}

/// One completion option.
#[derive(Debug, Clone)]
pub struct CompletionHit {
    /// The completion input that matched.
    pub text: String,
    /// The record it belongs to.
    pub record: StoredRecord,
}
