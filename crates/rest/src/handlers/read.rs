//! Read handler.
//!
//! `GET {item_route}` returns the current state of a record, or on
//! memento-enabled endpoints the revision current at `Accept-Datetime`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use pidrest_persistence::core::RecordStore;
use tracing::debug;

use super::{record_response, resolve_item};
use crate::error::RestResult;
use crate::extractors::Identity;
use crate::middleware::conditional::ConditionalHeaders;
use crate::middleware::content_type::negotiate;
use crate::middleware::memento::{AcceptDatetime, add_memento_headers, select_memento};
use crate::permissions::{Action, PermissionTarget, check_permission};
use crate::state::EndpointState;

/// Handler for record reads.
///
/// # HTTP Request
///
/// `GET {item_route}`
///
/// # Headers
///
/// - `Accept` - Content type negotiation (default: the endpoint's default media type)
/// - `If-Match` - Return 412 Precondition Failed if the ETag does not match
/// - `If-None-Match` - Return 304 Not Modified if the ETag matches
/// - `If-Modified-Since` - Return 304 Not Modified if not modified since date
/// - `Accept-Datetime` - Serve the revision current at that date (memento endpoints only)
///
/// # Response
///
/// - `200 OK` - The record
/// - `301 Moved Permanently` - The identifier redirects elsewhere
/// - `304 Not Modified` - Record unchanged (conditional read)
/// - `404 Not Found` - Identifier unknown or not registered
/// - `410 Gone` - Identifier or record deleted
///
/// # Example
///
/// ```http
/// GET /records/1 HTTP/1.1
/// Accept: application/json
/// If-None-Match: "2"
/// ```
pub async fn read_handler<S: RecordStore>(
    State(state): State<EndpointState<S>>,
    Path(pid_value): Path<String>,
    identity: Identity,
    conditional: ConditionalHeaders,
    accept_datetime: AcceptDatetime,
    headers: HeaderMap,
) -> RestResult<Response> {
    let endpoint = state.endpoint();
    debug!(
        pid_type = endpoint.pid_type(),
        pid_value = %pid_value,
        "Processing read request"
    );

    let (media_type, serializer) = negotiate(
        &headers,
        endpoint.record_serializers(),
        endpoint.default_media_type(),
    )?;
    let resolved = resolve_item(&state, &pid_value).await?;

    check_permission(
        endpoint.permission(Action::Read),
        &identity,
        PermissionTarget::Record(&resolved.record),
    )?;

    let memento = match accept_datetime.value() {
        Some(at) if endpoint.use_memento() => {
            let revisions = state.storage().record_revisions(resolved.record.id()).await?;
            let memento = select_memento(&revisions, at)
                .cloned()
                .unwrap_or_else(|| resolved.record.clone());
            debug!(revision = memento.revision(), at = %at, "Serving memento");
            Some(memento)
        }
        _ => None,
    };
    let record = memento.as_ref().unwrap_or(&resolved.record);
    conditional.check_read(record)?;

    let pid = resolved.pid.to_ref();
    let mut response = record_response(
        &state,
        StatusCode::OK,
        (media_type, serializer.as_ref()),
        &pid,
        record,
    )?;
    if let Some(memento) = &memento
        && let Some(original) = state.routes().item_url(&pid)
    {
        add_memento_headers(response.headers_mut(), memento, &original);
    }
    Ok(response)
}
