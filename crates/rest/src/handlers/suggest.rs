//! Suggest handler.
//!
//! `GET {list_route}_suggest?{name}={text}` returns completion options for
//! each configured suggester named in the query.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use pidrest_persistence::core::RecordStore;
use pidrest_persistence::types::CompletionQuery;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::endpoint::EndpointConfig;
use crate::error::{RestError, RestResult};
use crate::extractors::QueryParams;
use crate::state::EndpointState;

/// Options returned when neither the request nor the suggester sets a size.
pub const DEFAULT_SUGGEST_SIZE: usize = 5;

/// Handler for completion suggestions.
///
/// Read permission is not applied, as for listings.
///
/// # HTTP Request
///
/// `GET {list_route}_suggest?{name}={text}[&size=n][&{context}=value]`
///
/// # Response
///
/// - `200 OK` - Options per requested suggester
/// - `400 Bad Request` - No configured suggester requested, or a context missing
///
/// # Example
///
/// ```http
/// GET /records/_suggest?title=Back HTTP/1.1
/// ```
///
/// ```json
/// {"title": [{"text": "Back", "offset": 0, "length": 4,
///             "options": [{"text": "Back to the Future", "_id": "...", "_source": {...}}]}]}
/// ```
pub async fn suggest_handler<S: RecordStore>(
    State(state): State<EndpointState<S>>,
    params: QueryParams,
) -> RestResult<Response> {
    let endpoint = state.endpoint();
    debug!(endpoint = endpoint.name(), "Processing suggest request");

    let queries = completion_queries(endpoint, &params)?;
    let mut body = Map::new();
    for (name, query) in queries {
        let hits = state.storage().suggest(&query).await?;
        let options: Vec<Value> = hits
            .into_iter()
            .map(|hit| {
                json!({
                    "text": hit.text,
                    "_id": hit.record.id().to_string(),
                    "_source": hit.record.into_payload(),
                })
            })
            .collect();
        body.insert(
            name,
            json!([{
                "text": query.text,
                "offset": 0,
                "length": query.text.chars().count(),
                "options": options,
            }]),
        );
    }

    Ok(Json(Value::Object(body)).into_response())
}

/// Builds one completion query per requested suggester.
///
/// # Errors
///
/// `Validation` when a context suggester lacks its context parameter, or
/// when no configured suggester is requested.
pub fn completion_queries(
    endpoint: &EndpointConfig,
    params: &QueryParams,
) -> RestResult<Vec<(String, CompletionQuery)>> {
    let requested_size = params.get("size").and_then(|s| s.trim().parse::<usize>().ok());

    let mut queries = Vec::new();
    for (name, suggester) in endpoint.suggesters() {
        let Some(text) = params.get(name) else {
            continue;
        };
        let context = match &suggester.context {
            Some(field) => {
                let value = params.get(field).ok_or_else(|| RestError::Validation {
                    message: format!("Missing \"{}\" context", field),
                    errors: Vec::new(),
                })?;
                Some((field.clone(), value.to_string()))
            }
            None => None,
        };
        queries.push((
            name.clone(),
            CompletionQuery {
                index: endpoint.search_index().to_string(),
                field: suggester.field.clone(),
                text: text.to_string(),
                context,
                size: requested_size.or(suggester.size).unwrap_or(DEFAULT_SUGGEST_SIZE),
            },
        ));
    }

    if queries.is_empty() {
        let names: Vec<&str> = endpoint.suggesters().keys().map(String::as_str).collect();
        return Err(RestError::Validation {
            message: format!("No completions requested. (options: {})", names.join(", ")),
            errors: Vec::new(),
        });
    }
    Ok(queries)
}
