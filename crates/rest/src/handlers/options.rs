//! Options handler.
//!
//! `GET {list_route}_options` describes what an endpoint accepts.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use pidrest_persistence::core::RecordStore;
use serde_json::{Value, json};
use tracing::debug;

use crate::endpoint::EndpointConfig;
use crate::error::RestResult;
use crate::state::EndpointState;

/// Handler for the endpoint description.
///
/// # HTTP Request
///
/// `GET {list_route}_options`
///
/// # Response
///
/// - `200 OK` - Endpoint description
///
/// # Example
///
/// ```json
/// {"max_result_window": 10000, "default_media_type": "application/json",
///  "item_media_types": ["application/json"],
///  "search_media_types": ["application/json"],
///  "sort_fields": [{"year": {"title": "Year", "default_order": "desc"}}]}
/// ```
pub async fn options_handler<S: RecordStore>(
    State(state): State<EndpointState<S>>,
) -> RestResult<Response> {
    debug!(endpoint = state.endpoint().name(), "Processing options request");
    Ok(Json(options_body(state.endpoint())).into_response())
}

/// Builds the description of an endpoint.
///
/// Sort fields are listed by their `order`, then by key.
pub fn options_body(endpoint: &EndpointConfig) -> Value {
    let mut sort_options: Vec<_> = endpoint.sort_options().iter().collect();
    sort_options.sort_by(|(a_key, a), (b_key, b)| a.order.cmp(&b.order).then(a_key.cmp(b_key)));

    let sort_fields: Vec<Value> = sort_options
        .into_iter()
        .map(|(key, option)| {
            json!({key.as_str(): {"title": option.title, "default_order": option.default_order}})
        })
        .collect();

    json!({
        "max_result_window": endpoint.max_result_window(),
        "default_media_type": endpoint.default_media_type(),
        "item_media_types": endpoint.item_media_types(),
        "search_media_types": endpoint.search_media_types(),
        "sort_fields": sort_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{ComponentRegistry, default_endpoints};

    #[test]
    fn test_options_body() {
        let mut raw = default_endpoints()["recid"].clone();
        raw["max_result_window"] = json!(100);
        raw["sort_options"] = json!({
            "title": {"title": "Title", "fields": ["title"], "order": 2},
            "year": {"title": "Year", "fields": ["-year"], "default_order": "desc", "order": 1},
            "bestmatch": {"title": "Best match", "fields": ["_score"], "order": 2},
        });
        let Value::Object(map) = raw else { unreachable!() };
        let endpoint =
            EndpointConfig::build("recid", &map, &ComponentRegistry::with_defaults()).unwrap();

        assert_eq!(
            options_body(&endpoint),
            json!({
                "max_result_window": 100,
                "default_media_type": "application/json",
                "item_media_types": ["application/json"],
                "search_media_types": ["application/json"],
                "sort_fields": [
                    {"year": {"title": "Year", "default_order": "desc"}},
                    {"bestmatch": {"title": "Best match", "default_order": "asc"}},
                    {"title": {"title": "Title", "default_order": "asc"}},
                ],
            })
        );
    }
}
