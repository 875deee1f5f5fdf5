//! Search-related endpoint settings: sort options, facets and suggesters.

use std::collections::BTreeMap;

use pidrest_persistence::types::Aggregation;
use serde::{Deserialize, Serialize};

/// Direction a sort option is presented with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// A named sort option, selected with `?sort=key` or `?sort=-key`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortOption {
    /// Human-readable title.
    pub title: String,
    /// Sort fields, each `name` or `-name`.
    pub fields: Vec<String>,
    /// Order advertised by the options view.
    #[serde(default)]
    pub default_order: SortOrder,
    /// Position in the options view.
    #[serde(default)]
    pub order: i64,
}

/// Sort applied when the request names none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultSort {
    /// Sort key used when `q` is non-empty.
    #[serde(default)]
    pub query: Option<String>,
    /// Sort key used without a query.
    #[serde(default)]
    pub noquery: Option<String>,
}

impl DefaultSort {
    /// The sort key for a request with or without a query.
    pub fn for_request(&self, has_query: bool) -> Option<&str> {
        if has_query {
            self.query.as_deref()
        } else {
            self.noquery.as_deref()
        }
    }
}

/// How a facet parameter restricts documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetFilter {
    /// Field equals any of the parameter values.
    Terms(String),
    /// Field lies in the range given as `a--b`.
    Range(String),
}

/// Facet configuration of an endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetsConfig {
    /// Named terms aggregations.
    pub aggs: Vec<(String, Aggregation)>,
    /// Parameter filters restricting hits and aggregations.
    pub filters: Vec<(String, FacetFilter)>,
    /// Parameter filters restricting hits only.
    pub post_filters: Vec<(String, FacetFilter)>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFacets {
    #[serde(default)]
    aggs: BTreeMap<String, RawAggregation>,
    #[serde(default)]
    filters: BTreeMap<String, FacetFilter>,
    #[serde(default)]
    post_filters: BTreeMap<String, FacetFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAggregation {
    terms: RawTerms,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTerms {
    field: String,
    #[serde(default)]
    size: Option<usize>,
}

impl FacetsConfig {
    /// Parses the `facets` endpoint key.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, String> {
        let raw: RawFacets = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        let aggs = raw
            .aggs
            .into_iter()
            .map(|(name, agg)| {
                (
                    name,
                    Aggregation::Terms {
                        field: agg.terms.field,
                        size: agg.terms.size,
                    },
                )
            })
            .collect();
        Ok(Self {
            aggs,
            filters: raw.filters.into_iter().collect(),
            post_filters: raw.post_filters.into_iter().collect(),
        })
    }
}

/// A completion suggester.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggesterConfig {
    /// Field holding completion inputs.
    pub field: String,
    /// Field restricting options; its value comes from the parameter of
    /// the same name.
    #[serde(default)]
    pub context: Option<String>,
    /// Default number of options.
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSuggester {
    completion: SuggesterConfig,
}

impl SuggesterConfig {
    /// Parses one entry of the `suggesters` endpoint key.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, String> {
        let raw: RawSuggester = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        Ok(raw.completion)
    }
}
