//! Error types for the record REST API.
//!
//! This module defines all error types used throughout the REST API layer,
//! with a single conversion point into JSON error responses.
//!
//! # Error Body
//!
//! ```json
//! {"status": 400, "message": "Invalid pagination parameters.",
//!  "errors": [{"field": "page", "message": "..."}]}
//! ```
//!
//! # Error Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | PidNotFound, PidUnregistered, RouteNotFound | 404 |
//! | PidDeleted | 410 |
//! | Redirected | 301 |
//! | NotModified | 304 |
//! | InvalidData, PatchFailure, InvalidPagination, PaginationOutOfRange, InvalidQuery, Validation | 400 |
//! | Unauthorized | 401 |
//! | Forbidden | 403 |
//! | NotAcceptable | 406 |
//! | PreconditionFailed | 412 |
//! | UnsupportedMediaType | 415 |
//! | RedirectTargetUnroutable, MissingObject, ResolveFailed, InternalError | 500 |

use std::fmt;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use pidrest_persistence::error::{
    ConcurrencyError, PidError, RecordError, SearchError, StorageError,
};
use serde::Serialize;
use tracing::error;

use crate::resolver::ResolveError;

/// A field-level detail of a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Offending request field or parameter.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The primary error type for REST API operations.
#[derive(Debug)]
pub enum RestError {
    /// PID does not exist (HTTP 404).
    PidNotFound,

    /// PID is reserved but not registered (HTTP 404).
    PidUnregistered,

    /// PID has been deleted (HTTP 410).
    PidDeleted,

    /// PID redirects to another item (HTTP 301).
    Redirected {
        /// Absolute URL of the destination item.
        location: String,
    },

    /// Redirect target has no endpoint (HTTP 500).
    RedirectTargetUnroutable {
        /// PID type of the destination.
        pid_type: String,
    },

    /// PID is registered but bound to no record (HTTP 500).
    MissingObject {
        /// The PID, as `type:value`.
        pid: String,
    },

    /// PID could not be resolved to its record (HTTP 500).
    ResolveFailed {
        /// The PID value from the request.
        pid_value: String,
    },

    /// No route matches the request path (HTTP 404).
    RouteNotFound,

    /// Anonymous caller was denied (HTTP 401).
    Unauthorized,

    /// Authenticated caller was denied (HTTP 403).
    Forbidden,

    /// Conditional request header did not match (HTTP 412).
    PreconditionFailed,

    /// Conditional GET matched the current state (HTTP 304).
    NotModified {
        /// Current entity tag.
        etag: String,
    },

    /// No serializer for the requested media types (HTTP 406).
    NotAcceptable {
        /// The `Accept` header as sent.
        accept: String,
    },

    /// No loader for the request content type (HTTP 415).
    UnsupportedMediaType {
        /// The content type as sent.
        content_type: String,
    },

    /// Request body could not be loaded (HTTP 400).
    InvalidData,

    /// Patch document is malformed or does not apply (HTTP 400).
    PatchFailure,

    /// Pagination parameters are malformed or conflicting (HTTP 400).
    InvalidPagination {
        /// Per-parameter details.
        errors: Vec<FieldError>,
    },

    /// Requested page lies beyond the result window (HTTP 400).
    PaginationOutOfRange,

    /// Query string could not be parsed (HTTP 400).
    InvalidQuery,

    /// Other request validation failure (HTTP 400).
    Validation {
        /// Summary message.
        message: String,
        /// Per-field details.
        errors: Vec<FieldError>,
    },

    /// Internal server error (HTTP 500).
    ///
    /// The message is logged, never sent to the client.
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Returns the HTTP status code of this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::PidNotFound | RestError::PidUnregistered | RestError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            RestError::PidDeleted => StatusCode::GONE,
            RestError::Redirected { .. } => StatusCode::MOVED_PERMANENTLY,
            RestError::NotModified { .. } => StatusCode::NOT_MODIFIED,
            RestError::Unauthorized => StatusCode::UNAUTHORIZED,
            RestError::Forbidden => StatusCode::FORBIDDEN,
            RestError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            RestError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            RestError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RestError::InvalidData
            | RestError::PatchFailure
            | RestError::InvalidPagination { .. }
            | RestError::PaginationOutOfRange
            | RestError::InvalidQuery
            | RestError::Validation { .. } => StatusCode::BAD_REQUEST,
            RestError::RedirectTargetUnroutable { .. }
            | RestError::MissingObject { .. }
            | RestError::ResolveFailed { .. }
            | RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client.
    fn public_message(&self) -> String {
        match self {
            RestError::InternalError { .. } => "Internal server error.".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::PidNotFound => write!(f, "PID does not exist."),
            RestError::PidUnregistered => write!(f, "PID is not registered."),
            RestError::PidDeleted => write!(f, "PID has been deleted."),
            RestError::Redirected { .. } => write!(f, "Moved Permanently"),
            RestError::RedirectTargetUnroutable { pid_type } => {
                write!(f, "Invalid redirect - pid_type \"{}\" endpoint missing.", pid_type)
            }
            RestError::MissingObject { pid } => write!(f, "No object assigned to {}.", pid),
            RestError::ResolveFailed { pid_value } => {
                write!(f, "PID #{} could not be resolved.", pid_value)
            }
            RestError::RouteNotFound => {
                write!(f, "The requested URL was not found on the server.")
            }
            RestError::Unauthorized => write!(
                f,
                "The server could not verify that you are authorized to access the requested resource."
            ),
            RestError::Forbidden => write!(
                f,
                "You don't have the permission to access the requested resource."
            ),
            RestError::PreconditionFailed => write!(
                f,
                "The precondition on the request for the URL failed positive evaluation."
            ),
            RestError::NotModified { .. } => write!(f, "Not Modified"),
            RestError::NotAcceptable { accept } => {
                write!(f, "No serializer available for \"{}\".", accept)
            }
            RestError::UnsupportedMediaType { content_type } => {
                write!(f, "Unsupported media type \"{}\".", content_type)
            }
            RestError::InvalidData => write!(f, "Could not load data."),
            RestError::PatchFailure => write!(f, "Could not patch JSON."),
            RestError::InvalidPagination { .. } => write!(f, "Invalid pagination parameters."),
            RestError::PaginationOutOfRange => {
                write!(f, "Maximum number of results have been reached.")
            }
            RestError::InvalidQuery => write!(f, "Invalid query syntax."),
            RestError::Validation { message, .. } => write!(f, "{}", message),
            RestError::InternalError { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            RestError::InternalError { message } => {
                error!(status = status.as_u16(), error = %message, "Request failed");
            }
            RestError::NotModified { etag } => {
                let mut response = status.into_response();
                if let Ok(value) = HeaderValue::from_str(etag) {
                    response.headers_mut().insert(header::ETAG, value);
                }
                return response;
            }
            RestError::Redirected { location } => {
                let body = serde_json::json!({
                    "status": status.as_u16(),
                    "message": self.public_message(),
                    "location": location,
                });
                let mut response = (status, Json(body)).into_response();
                if let Ok(value) = HeaderValue::from_str(location) {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                return response;
            }
            _ => {}
        }

        let mut body = serde_json::json!({
            "status": status.as_u16(),
            "message": self.public_message(),
        });
        let errors = match &self {
            RestError::InvalidPagination { errors } | RestError::Validation { errors, .. } => {
                Some(errors)
            }
            _ => None,
        };
        if let Some(errors) = errors.filter(|e| !e.is_empty()) {
            body["errors"] = serde_json::json!(errors);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for REST operations.
pub type RestResult<T> = Result<T, RestError>;

// Implement conversions from storage errors

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Pid(e) => e.into(),
            StorageError::Record(e) => e.into(),
            StorageError::Concurrency(e) => e.into(),
            StorageError::Search(e) => e.into(),
            StorageError::Transaction(e) => RestError::InternalError {
                message: e.to_string(),
            },
            StorageError::Backend(e) => RestError::InternalError {
                message: e.to_string(),
            },
        }
    }
}

impl From<PidError> for RestError {
    fn from(err: PidError) -> Self {
        match err {
            PidError::DoesNotExist { .. } => RestError::PidNotFound,
            PidError::PresetValue { field, .. } => RestError::Validation {
                message: "Could not load data.".to_string(),
                errors: vec![FieldError::new(
                    field,
                    "This field is assigned by the server.",
                )],
            },
            PidError::AlreadyExists { .. }
            | PidError::InvalidStatusTransition { .. }
            | PidError::MissingValue { .. } => RestError::InternalError {
                message: err.to_string(),
            },
        }
    }
}

impl From<RecordError> for RestError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Gone { .. } => RestError::PidDeleted,
            RecordError::NotFound { .. } | RecordError::AlreadyExists { .. } => {
                RestError::InternalError {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<ConcurrencyError> for RestError {
    fn from(err: ConcurrencyError) -> Self {
        match err {
            ConcurrencyError::RevisionConflict { .. } => RestError::PreconditionFailed,
        }
    }
}

impl From<SearchError> for RestError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::QueryParseError { .. } => RestError::InvalidQuery,
            SearchError::InvalidFilter { field, message } => RestError::Validation {
                message: "Invalid search filter.".to_string(),
                errors: vec![FieldError::new(field, message)],
            },
        }
    }
}

impl From<ResolveError> for RestError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound { .. } => RestError::PidNotFound,
            ResolveError::Unregistered { .. } => RestError::PidUnregistered,
            ResolveError::Deleted { .. } => RestError::PidDeleted,
            ResolveError::Redirected { location, .. } => RestError::Redirected { location },
            ResolveError::RedirectTargetUnroutable { destination, .. } => {
                RestError::RedirectTargetUnroutable {
                    pid_type: destination.pid_type,
                }
            }
            ResolveError::MissingObject { pid } => RestError::MissingObject {
                pid: pid.to_string(),
            },
            ResolveError::ResolveFailed { pid, .. } => RestError::ResolveFailed {
                pid_value: pid.pid_value,
            },
        }
    }
}
