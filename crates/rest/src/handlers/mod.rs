//! HTTP request handlers for record endpoints.
//!
//! - [`search`] - List records matching a query
//! - [`create`] - Create a record and mint its identifier
//! - [`read`] - Read a record by identifier
//! - [`update`] - Replace a record
//! - [`patch`] - Patch a record with JSON Patch
//! - [`delete`] - Delete a record and its identifiers
//! - [`options`] - Describe an endpoint
//! - [`suggest`] - Completion suggestions
//! - [`fallback`] - Unknown routes

pub mod create;
pub mod delete;
pub mod fallback;
pub mod options;
pub mod patch;
pub mod read;
pub mod search;
pub mod suggest;
pub mod update;

pub use create::create_handler;
pub use delete::delete_handler;
pub use fallback::fallback_handler;
pub use options::options_handler;
pub use patch::patch_handler;
pub use read::read_handler;
pub use search::search_handler;
pub use suggest::suggest_handler;
pub use update::update_handler;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pidrest_persistence::core::{RecordStore, Transaction};
use pidrest_persistence::error::StorageError;
use pidrest_persistence::types::{PidRef, StoredRecord};
use tracing::{error, warn};

use crate::error::{RestError, RestResult};
use crate::links::link_header;
use crate::resolver::ResolvedPid;
use crate::responses::RecordHeaders;
use crate::serializers::{RecordSerializer, RecordView};
use crate::state::EndpointState;

/// Resolves the `{pid_value}` segment of an item request.
pub(crate) async fn resolve_item<S: RecordStore>(
    state: &EndpointState<S>,
    pid_value: &str,
) -> RestResult<ResolvedPid> {
    Ok(state.resolver().resolve(state.storage(), pid_value).await?)
}

/// Serializes a record with its ETag, Last-Modified and Link headers.
///
/// Created records also carry `Location`, the record's `self` link.
pub(crate) fn record_response<S: RecordStore>(
    state: &EndpointState<S>,
    status: StatusCode,
    (media_type, serializer): (&str, &dyn RecordSerializer),
    pid: &PidRef,
    record: &StoredRecord,
) -> RestResult<Response> {
    let links = state.record_links(pid);
    let body = serializer.serialize_record(&RecordView {
        pid,
        record,
        links: &links,
    })?;

    let mut headers = RecordHeaders::from_record(record)
        .with_content_type(media_type)
        .with_link(link_header(
            links.iter().map(|(rel, url)| (rel.as_str(), url.as_str())),
        ));
    if status == StatusCode::CREATED
        && let Some(location) = links.get("self")
    {
        headers = headers.with_location(location.clone());
    }

    Ok((status, headers.to_header_map(), body).into_response())
}

/// Rolls back a failed unit of work and maps the failure.
pub(crate) async fn rollback(tx: Box<dyn Transaction>, err: StorageError) -> RestError {
    warn!(error = %err, "Rolling back transaction");
    if let Err(rollback_err) = tx.rollback().await {
        error!(error = %rollback_err, "Transaction rollback failed");
    }
    err.into()
}

/// Commits a unit of work.
pub(crate) async fn commit(tx: Box<dyn Transaction>) -> RestResult<()> {
    Ok(tx.commit().await?)
}
