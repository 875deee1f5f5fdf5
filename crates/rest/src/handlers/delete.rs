//! Delete handler.
//!
//! `DELETE {item_route}` soft-deletes a record and marks every identifier
//! bound to it as deleted, in one transaction.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pidrest_persistence::core::RecordStore;
use pidrest_persistence::error::StorageError;
use tracing::{debug, info};

use super::{commit, resolve_item, rollback};
use crate::error::RestResult;
use crate::extractors::Identity;
use crate::middleware::conditional::ConditionalHeaders;
use crate::permissions::{Action, PermissionTarget, check_permission};
use crate::state::EndpointState;

/// Handler for record deletion.
///
/// Subsequent reads of any of the record's identifiers return 410 Gone.
///
/// # HTTP Request
///
/// `DELETE {item_route}`
///
/// # Headers
///
/// - `If-Match` - Return 412 Precondition Failed if the ETag does not match
///
/// # Response
///
/// - `204 No Content` - Record deleted
/// - `401 Unauthorized` / `403 Forbidden` - Delete permission denied
/// - `404 Not Found` / `410 Gone` / `301 Moved Permanently` - Resolution outcomes
/// - `412 Precondition Failed` - Stale ETag, or a concurrent write won
///
/// # Example
///
/// ```http
/// DELETE /records/1 HTTP/1.1
/// If-Match: "2"
/// ```
pub async fn delete_handler<S: RecordStore>(
    State(state): State<EndpointState<S>>,
    Path(pid_value): Path<String>,
    identity: Identity,
    conditional: ConditionalHeaders,
) -> RestResult<Response> {
    let endpoint = state.endpoint();
    debug!(
        pid_type = endpoint.pid_type(),
        pid_value = %pid_value,
        "Processing delete request"
    );

    let resolved = resolve_item(&state, &pid_value).await?;
    check_permission(
        endpoint.permission(Action::Delete),
        &identity,
        PermissionTarget::Record(&resolved.record),
    )?;
    conditional.check_if_match(&resolved.record)?;

    let id = resolved.record.id();
    let mut tx = state.storage().begin_transaction().await?;
    let deleted = async {
        tx.delete_record(id, resolved.record.revision()).await?;
        Ok::<_, StorageError>(tx.delete_pids_for_object(id).await?)
    }
    .await;
    let pids = match deleted {
        Ok(pids) => pids,
        Err(e) => return Err(rollback(tx, e).await),
    };
    commit(tx).await?;

    info!(
        pid = %resolved.pid,
        object_uuid = %id,
        deleted_pids = pids.len(),
        "Deleted record"
    );
    Ok(StatusCode::NO_CONTENT.into_response())
}
