//! Replace handler.
//!
//! `PUT {item_route}` replaces the payload of a record wholesale. The field
//! the minter wrote at creation is carried over from the stored payload.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use pidrest_persistence::core::RecordStore;
use serde_json::Value;
use tracing::{debug, info};

use super::{commit, record_response, resolve_item, rollback};
use crate::error::RestResult;
use crate::extractors::Identity;
use crate::middleware::conditional::ConditionalHeaders;
use crate::middleware::content_type::{negotiate, select_by_content_type};
use crate::permissions::{Action, PermissionTarget, check_permission};
use crate::resolver::ResolvedPid;
use crate::state::EndpointState;

/// Handler for record replacement.
///
/// # HTTP Request
///
/// `PUT {item_route}`
///
/// # Headers
///
/// - `Content-Type` - Selects the loader
/// - `If-Match` - Return 412 Precondition Failed if the ETag does not match
///
/// # Response
///
/// - `200 OK` - Record replaced, with the new revision
/// - `400 Bad Request` - Body could not be loaded
/// - `401 Unauthorized` / `403 Forbidden` - Update permission denied
/// - `404 Not Found` / `410 Gone` / `301 Moved Permanently` - Resolution outcomes
/// - `412 Precondition Failed` - Stale ETag, or a concurrent write won
/// - `415 Unsupported Media Type` - No loader for the content type
///
/// # Example
///
/// ```http
/// PUT /records/1 HTTP/1.1
/// Content-Type: application/json
/// If-Match: "1"
///
/// {"title": "Back to the Future", "year": 1985, "stars": 5}
/// ```
pub async fn update_handler<S: RecordStore>(
    State(state): State<EndpointState<S>>,
    Path(pid_value): Path<String>,
    identity: Identity,
    conditional: ConditionalHeaders,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response> {
    let endpoint = state.endpoint();
    debug!(
        pid_type = endpoint.pid_type(),
        pid_value = %pid_value,
        "Processing update request"
    );

    let loader = select_by_content_type(&headers, endpoint.record_loaders())?;
    let (media_type, serializer) = negotiate(
        &headers,
        endpoint.record_serializers(),
        endpoint.default_media_type(),
    )?;
    let resolved = resolve_item(&state, &pid_value).await?;

    check_permission(
        endpoint.permission(Action::Update),
        &identity,
        PermissionTarget::Record(&resolved.record),
    )?;
    conditional.check_if_match(&resolved.record)?;

    let mut data = loader.load(&body)?;
    endpoint.minter().preserve(resolved.record.payload(), &mut data);

    let response = replace_record(&state, &identity, resolved, data).await?;
    record_response(
        &state,
        StatusCode::OK,
        (media_type, serializer.as_ref()),
        &response.pid.to_ref(),
        &response.record,
    )
}

/// Checks the candidate and writes it with a revision compare-and-swap.
///
/// Shared by PUT and PATCH once the new payload is known.
pub(crate) async fn replace_record<S: RecordStore>(
    state: &EndpointState<S>,
    identity: &Identity,
    resolved: ResolvedPid,
    data: Value,
) -> RestResult<ResolvedPid> {
    let endpoint = state.endpoint();
    check_permission(
        endpoint.permission(Action::Update),
        identity,
        PermissionTarget::Candidate(&data),
    )?;

    let id = resolved.record.id();
    let mut tx = state.storage().begin_transaction().await?;
    let record = match tx.update_record(id, resolved.record.revision(), data).await {
        Ok(record) => record,
        Err(e) => return Err(rollback(tx, e).await),
    };
    commit(tx).await?;

    info!(pid = %resolved.pid, revision = record.revision(), "Updated record");
    Ok(ResolvedPid {
        pid: resolved.pid,
        record,
    })
}
