//! Record and search serializers, and request loaders.
//!
//! Serializers turn a record (or a page of records) into response bytes
//! for one media type; loaders turn a request body into a document. Both
//! are registered by name in the
//! [`ComponentRegistry`](crate::endpoint::ComponentRegistry) and bound to
//! media types per endpoint.
//!
//! # JSON v1
//!
//! ```json
//! {"id": "1", "metadata": {...}, "links": {"self": "..."},
//!  "created": "2015-10-21T07:28:00+00:00", "updated": "...", "revision": 1}
//! ```

use std::fmt::Debug;

use pidrest_persistence::types::{PidRef, StoredRecord};
use serde_json::{Map, Value, json};

use crate::error::{RestError, RestResult};
use crate::links::{Links, SearchLinks};

/// A record as handed to serializers.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    /// Identifier the record is addressed by.
    pub pid: &'a PidRef,
    /// The record.
    pub record: &'a StoredRecord,
    /// Links built by the endpoint's links factory.
    pub links: &'a Links,
}

/// A search page as handed to serializers.
#[derive(Debug, Clone)]
pub struct SearchView<'a> {
    /// Hits of the page.
    pub hits: Vec<RecordView<'a>>,
    /// Total number of matches.
    pub total: usize,
    /// Navigation links.
    pub links: &'a SearchLinks,
    /// Aggregation results.
    pub aggregations: &'a Map<String, Value>,
}

/// Serializes single records.
pub trait RecordSerializer: Send + Sync + Debug {
    /// Returns the response body.
    fn serialize_record(&self, view: &RecordView<'_>) -> RestResult<Vec<u8>>;
}

/// Serializes search pages.
pub trait SearchSerializer: Send + Sync + Debug {
    /// Returns the response body.
    fn serialize_search(&self, view: &SearchView<'_>) -> RestResult<Vec<u8>>;
}

/// Deserializes request bodies into documents.
pub trait RecordLoader: Send + Sync + Debug {
    /// Loads a document.
    ///
    /// # Errors
    ///
    /// `InvalidData` when the body is not an acceptable document.
    fn load(&self, body: &[u8]) -> RestResult<Value>;
}

/// The JSON v1 record and search format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonV1Serializer;

impl JsonV1Serializer {
    /// Builds the JSON v1 shape of a record.
    pub fn record_json(view: &RecordView<'_>) -> Value {
        json!({
            "id": view.pid.pid_value,
            "metadata": view.record.payload(),
            "links": view.links,
            "created": view.record.created().to_rfc3339(),
            "updated": view.record.updated().to_rfc3339(),
            "revision": view.record.revision(),
        })
    }

    /// Builds the JSON v1 shape of a search page.
    pub fn search_json(view: &SearchView<'_>) -> Value {
        let hits: Vec<Value> = view.hits.iter().map(Self::record_json).collect();
        let mut body = json!({
            "hits": {"hits": hits, "total": view.total},
            "links": view.links,
        });
        if !view.aggregations.is_empty() {
            body["aggregations"] = Value::Object(view.aggregations.clone());
        }
        body
    }
}

impl RecordSerializer for JsonV1Serializer {
    fn serialize_record(&self, view: &RecordView<'_>) -> RestResult<Vec<u8>> {
        to_bytes(&Self::record_json(view))
    }
}

impl SearchSerializer for JsonV1Serializer {
    fn serialize_search(&self, view: &SearchView<'_>) -> RestResult<Vec<u8>> {
        to_bytes(&Self::search_json(view))
    }
}

fn to_bytes(value: &Value) -> RestResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| RestError::InternalError {
        message: format!("Failed to serialize response: {}", e),
    })
}

/// Loads JSON object bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonV1Loader;

impl RecordLoader for JsonV1Loader {
    fn load(&self, body: &[u8]) -> RestResult<Value> {
        match serde_json::from_slice::<Value>(body) {
            Ok(document @ Value::Object(_)) => Ok(document),
            _ => Err(RestError::InvalidData),
        }
    }
}
