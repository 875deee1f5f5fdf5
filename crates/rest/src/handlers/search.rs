//! List handler.
//!
//! `GET {list_route}` searches the endpoint's index and returns one page of
//! records with navigation links.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use pidrest_persistence::core::RecordStore;
use pidrest_persistence::types::PidRef;
use tracing::debug;

use crate::error::RestResult;
use crate::extractors::{Identity, PaginationCursor, QueryParams};
use crate::links::{Links, build_links};
use crate::middleware::content_type::negotiate;
use crate::permissions::{Action, PermissionTarget, check_permission};
use crate::query::build_search_request;
use crate::serializers::{RecordView, SearchView};
use crate::state::EndpointState;

/// Handler for record searches.
///
/// # HTTP Request
///
/// `GET {list_route}?q=...&sort=...&page=N&size=M`
///
/// `from=N` may replace `page=N`; facet filters are passed by name.
///
/// # Headers
///
/// - `Accept` - Content type negotiation (default: the endpoint's default media type)
///
/// # Response
///
/// - `200 OK` - The page of hits, with a `Link` header
/// - `400 Bad Request` - Invalid pagination, query or filter
/// - `401 Unauthorized` / `403 Forbidden` - List permission denied
/// - `406 Not Acceptable` - No search serializer matches `Accept`
///
/// # Example
///
/// ```http
/// GET /records/?q=back&sort=-year&page=1&size=10 HTTP/1.1
/// Accept: application/json
/// ```
pub async fn search_handler<S: RecordStore>(
    State(state): State<EndpointState<S>>,
    identity: Identity,
    params: QueryParams,
    headers: HeaderMap,
) -> RestResult<Response> {
    let endpoint = state.endpoint();
    debug!(endpoint = endpoint.name(), "Processing search request");

    check_permission(
        endpoint.permission(Action::List),
        &identity,
        PermissionTarget::Collection,
    )?;

    let cursor = PaginationCursor::from_params(&params, state.default_page_size())?;
    cursor.check_window(endpoint.max_result_window())?;

    let (media_type, serializer) = negotiate(
        &headers,
        endpoint.search_serializers(),
        endpoint.default_media_type(),
    )?;

    let request = build_search_request(endpoint, &params, &cursor)?;
    let result = state.storage().search(&request.query).await?;

    let mut identified: Vec<(PidRef, Links)> = Vec::with_capacity(result.hits.len());
    for record in &result.hits {
        let pid = endpoint.fetcher().fetch(record.id(), record.payload())?;
        let links = state.record_links(&pid);
        identified.push((pid, links));
    }
    let hits = result
        .hits
        .iter()
        .zip(&identified)
        .map(|(record, (pid, links))| RecordView { pid, record, links })
        .collect();

    let links = build_links(
        state.routes(),
        endpoint.list_route(),
        &cursor,
        &request.url_args,
        result.total,
        endpoint.max_result_window(),
    );
    let body = serializer.serialize_search(&SearchView {
        hits,
        total: result.total,
        links: &links,
        aggregations: &result.aggregations,
    })?;

    debug!(
        endpoint = endpoint.name(),
        total = result.total,
        returned = result.hits.len(),
        "Returning search page"
    );

    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(media_type) {
        response_headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&links.to_link_header()) {
        response_headers.insert(header::LINK, value);
    }
    Ok((StatusCode::OK, response_headers, body).into_response())
}
