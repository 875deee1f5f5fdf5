//! Patch handler.
//!
//! `PATCH {item_route}` applies an RFC 6902 JSON Patch document to a record.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use pidrest_persistence::core::RecordStore;
use serde_json::Value;
use tracing::debug;

use super::update::replace_record;
use super::{record_response, resolve_item};
use crate::error::{RestError, RestResult};
use crate::extractors::Identity;
use crate::middleware::conditional::ConditionalHeaders;
use crate::middleware::content_type::{JSON_PATCH_MEDIA_TYPE, negotiate, request_content_type};
use crate::permissions::{Action, PermissionTarget, check_permission};
use crate::state::EndpointState;

/// Handler for record patches.
///
/// # HTTP Request
///
/// `PATCH {item_route}`
///
/// # Headers
///
/// - `Content-Type` - Must be `application/json-patch+json`
/// - `If-Match` - Return 412 Precondition Failed if the ETag does not match
///
/// # Response
///
/// - `200 OK` - Record patched, with the new revision
/// - `400 Bad Request` - Body is not JSON, or the patch does not apply
/// - `401 Unauthorized` / `403 Forbidden` - Update permission denied
/// - `412 Precondition Failed` - Stale ETag, or a concurrent write won
/// - `415 Unsupported Media Type` - Not a JSON Patch document
///
/// # Example
///
/// ```http
/// PATCH /records/1 HTTP/1.1
/// Content-Type: application/json-patch+json
///
/// [{"op": "replace", "path": "/year", "value": 1985}]
/// ```
pub async fn patch_handler<S: RecordStore>(
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
        "Processing patch request"
    );

    let content_type = request_content_type(&headers);
    if content_type.as_deref() != Some(JSON_PATCH_MEDIA_TYPE) {
        return Err(RestError::UnsupportedMediaType {
            content_type: content_type.unwrap_or_default(),
        });
    }
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

    let operations: Value = serde_json::from_slice(&body).map_err(|_| RestError::InvalidData)?;
    let mut data = apply_patch(resolved.record.payload(), &operations)?;
    endpoint.minter().preserve(resolved.record.payload(), &mut data);

    let patched = replace_record(&state, &identity, resolved, data).await?;
    record_response(
        &state,
        StatusCode::OK,
        (media_type, serializer.as_ref()),
        &patched.pid.to_ref(),
        &patched.record,
    )
}

/// Applies a JSON Patch to a copy of `document`.
///
/// # Errors
///
/// `PatchFailure` when `operations` is not a patch document, an operation
/// fails, or the result is not a JSON object.
pub fn apply_patch(document: &Value, operations: &Value) -> RestResult<Value> {
    let patch: json_patch::Patch =
        serde_json::from_value(operations.clone()).map_err(|e| {
            debug!(error = %e, "Invalid JSON Patch document");
            RestError::PatchFailure
        })?;

    let mut patched = document.clone();
    json_patch::patch(&mut patched, &patch).map_err(|e| {
        debug!(error = %e, "JSON Patch did not apply");
        RestError::PatchFailure
    })?;

    if !patched.is_object() {
        return Err(RestError::PatchFailure);
    }
    Ok(patched)
}
