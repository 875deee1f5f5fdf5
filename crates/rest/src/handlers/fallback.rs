//! Fallback handler for unknown routes.

use axum::http::Uri;
use tracing::debug;

use crate::error::RestError;

/// Answers requests no endpoint route matches with the JSON 404 body.
pub async fn fallback_handler(uri: Uri) -> RestError {
    debug!(path = %uri.path(), "No route matches request");
    RestError::RouteNotFound
}
