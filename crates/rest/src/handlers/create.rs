//! Create handler.
//!
//! `POST {list_route}` mints an identifier and stores a new record.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use pidrest_persistence::core::RecordStore;
use pidrest_persistence::error::StorageError;
use tracing::{debug, info};
use uuid::Uuid;

use super::{commit, record_response, rollback};
use crate::error::RestResult;
use crate::extractors::Identity;
use crate::middleware::content_type::{negotiate, select_by_content_type};
use crate::permissions::{Action, PermissionTarget, check_permission};
use crate::state::EndpointState;

/// Handler for record creation.
///
/// The minter and the record write share one transaction, so a failed
/// create leaves no identifier behind.
///
/// # HTTP Request
///
/// `POST {list_route}`
///
/// # Headers
///
/// - `Content-Type` - Selects the loader (default table: `application/json`)
/// - `Accept` - Content type negotiation of the response
///
/// # Response
///
/// - `201 Created` - Record created, with `Location`, `ETag` and `Last-Modified`
/// - `400 Bad Request` - Body could not be loaded
/// - `401 Unauthorized` / `403 Forbidden` - Create permission denied
/// - `406 Not Acceptable` - No record serializer matches `Accept`
/// - `415 Unsupported Media Type` - No loader for the content type
///
/// # Example
///
/// ```http
/// POST /records/ HTTP/1.1
/// Content-Type: application/json
///
/// {"title": "Back to the Future", "year": 2015, "stars": 4}
/// ```
pub async fn create_handler<S: RecordStore>(
    State(state): State<EndpointState<S>>,
    identity: Identity,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response> {
    let endpoint = state.endpoint();
    debug!(endpoint = endpoint.name(), "Processing create request");

    check_permission(
        endpoint.permission(Action::Create),
        &identity,
        PermissionTarget::Collection,
    )?;

    let (media_type, serializer) = negotiate(
        &headers,
        endpoint.record_serializers(),
        endpoint.default_media_type(),
    )?;
    let loader = select_by_content_type(&headers, endpoint.record_loaders())?;
    let mut data = loader.load(&body)?;

    check_permission(
        endpoint.permission(Action::Create),
        &identity,
        PermissionTarget::Candidate(&data),
    )?;

    let id = Uuid::new_v4();
    let mut tx = state.storage().begin_transaction().await?;
    let written = async {
        let pid = endpoint.minter().mint(tx.as_mut(), id, &mut data).await?;
        let record = tx.create_record(id, endpoint.search_index(), data).await?;
        Ok::<_, StorageError>((pid, record))
    }
    .await;
    let (pid, record) = match written {
        Ok(written) => written,
        Err(e) => return Err(rollback(tx, e).await),
    };
    commit(tx).await?;

    info!(pid = %pid, object_uuid = %id, "Created record");
    record_response(
        &state,
        StatusCode::CREATED,
        (media_type, serializer.as_ref()),
        &pid.to_ref(),
        &record,
    )
}
