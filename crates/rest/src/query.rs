//! Search request factory.
//!
//! Turns the query parameters of a list request into a [`SearchQuery`] and
//! the URL arguments that must be forwarded into pagination links.
//!
//! | Parameter | Effect |
//! |-----------|--------|
//! | `q` | query string, passed to the search provider |
//! | `sort` | `key` or `-key` of a configured sort option |
//! | facet filter names | terms or range filters |
//!
//! Arguments are forwarded in a fixed order: facet filters (configured
//! name order, then value order), then `sort`, then `q`.

use pidrest_persistence::types::{Filter, RangeBound, SearchQuery, SortField};
use tracing::debug;

use crate::endpoint::{EndpointConfig, FacetFilter};
use crate::error::{FieldError, RestError, RestResult};
use crate::extractors::{PaginationCursor, QueryParams};

/// A composed search and the arguments reproducing it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// The query to execute.
    pub query: SearchQuery,
    /// Arguments forwarded into links.
    pub url_args: Vec<(String, String)>,
}

/// Composes the search of a list request.
///
/// # Errors
///
/// `Validation` when a range filter value is malformed.
pub fn build_search_request(
    endpoint: &EndpointConfig,
    params: &QueryParams,
    cursor: &PaginationCursor,
) -> RestResult<SearchRequest> {
    let mut query = SearchQuery::new(endpoint.search_index())
        .with_window(cursor.from_idx(), cursor.size());
    let mut url_args = Vec::new();

    let facets = endpoint.facets();
    for (name, aggregation) in &facets.aggs {
        query = query.with_aggregation(name.clone(), aggregation.clone());
    }
    for (param, facet) in &facets.filters {
        if let Some(filter) = facet_filter(param, facet, params, &mut url_args)? {
            query = query.with_filter(filter);
        }
    }
    for (param, facet) in &facets.post_filters {
        if let Some(filter) = facet_filter(param, facet, params, &mut url_args)? {
            query = query.with_post_filter(filter);
        }
    }

    let query_string = params
        .get("q")
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let sort_key = params
        .get("sort")
        .or_else(|| endpoint.default_sort().for_request(query_string.is_some()));
    if let Some(key) = sort_key {
        let (name, descending) = match key.strip_prefix('-') {
            Some(name) => (name, true),
            None => (key, false),
        };
        match endpoint.sort_options().get(name) {
            Some(option) => {
                for field in &option.fields {
                    let sort = SortField::parse(field);
                    query = query.with_sort(if descending { sort.reversed() } else { sort });
                }
                url_args.push(("sort".to_string(), key.to_string()));
            }
            None => debug!(sort = key, "Ignoring unknown sort option"),
        }
    }

    if let Some(q) = query_string {
        query = query.with_query(q);
        url_args.push(("q".to_string(), q.to_string()));
    }

    Ok(SearchRequest { query, url_args })
}

fn facet_filter(
    param: &str,
    facet: &FacetFilter,
    params: &QueryParams,
    url_args: &mut Vec<(String, String)>,
) -> RestResult<Option<Filter>> {
    let values = params.get_all(param);
    if values.is_empty() {
        return Ok(None);
    }
    let filter = match facet {
        FacetFilter::Terms(field) => Filter::Terms {
            field: field.clone(),
            values: values.iter().map(|v| v.to_string()).collect(),
        },
        FacetFilter::Range(field) => parse_range(field, &values)?,
    };
    url_args.extend(values.iter().map(|v| (param.to_string(), v.to_string())));
    Ok(Some(filter))
}

/// Parses `a--b`, where either side may be empty and a leading `>` (lower)
/// or `<` (upper) makes that side exclusive.
fn parse_range(field: &str, values: &[&str]) -> RestResult<Filter> {
    let invalid = || RestError::Validation {
        message: "Invalid range format.".to_string(),
        errors: vec![FieldError::new(field, "Invalid range format.")],
    };

    let [value] = values else {
        return Err(invalid());
    };
    if value.matches("--").count() != 1 || *value == "--" {
        return Err(invalid());
    }
    let (lower, upper) = value.split_once("--").ok_or_else(invalid)?;

    let bound = |end: &str, strict: char| {
        if end.is_empty() {
            None
        } else if let Some(rest) = end.strip_prefix(strict) {
            Some(RangeBound::exclusive(rest))
        } else {
            Some(RangeBound::inclusive(end))
        }
    };

    Ok(Filter::Range {
        field: field.to_string(),
        lower: bound(lower, '>'),
        upper: bound(upper, '<'),
    })
}
