//! Conditional request header handling.
//!
//! - If-Match: optimistic locking for writes (412 on mismatch)
//! - If-None-Match: conditional read (304 on match)
//! - If-Modified-Since: conditional read by date (304 when unchanged)

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};
use pidrest_persistence::types::StoredRecord;
use tracing::debug;

use crate::error::{RestError, RestResult};

/// Extracted conditional headers from a request.
#[derive(Debug, Default)]
pub struct ConditionalHeaders {
    /// If-Match header value.
    if_match: Option<String>,

    /// If-None-Match header value.
    if_none_match: Option<String>,

    /// If-Modified-Since header value.
    if_modified_since: Option<DateTime<Utc>>,
}

impl ConditionalHeaders {
    /// Creates a new ConditionalHeaders from a HeaderMap.
    ///
    /// An unparseable If-Modified-Since is ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_match = headers
            .get(header::IF_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let if_none_match = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let if_modified_since = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Self {
            if_match,
            if_none_match,
            if_modified_since,
        }
    }

    /// Returns the If-Match header value.
    pub fn if_match(&self) -> Option<&str> {
        self.if_match.as_deref()
    }

    /// Returns the If-None-Match header value.
    pub fn if_none_match(&self) -> Option<&str> {
        self.if_none_match.as_deref()
    }

    /// Returns the If-Modified-Since header value.
    pub fn if_modified_since(&self) -> Option<DateTime<Utc>> {
        self.if_modified_since
    }

    /// Fails with 412 when If-Match does not match the record.
    pub fn check_if_match(&self, record: &StoredRecord) -> RestResult<()> {
        match self.if_match() {
            Some(condition) if !etag_matches(condition, &record.etag()) => {
                debug!(if_match = %condition, etag = %record.etag(), "Precondition failed");
                Err(RestError::PreconditionFailed)
            }
            _ => Ok(()),
        }
    }

    /// Evaluates the conditions of a read.
    ///
    /// If-Match is checked first (412); a matching If-None-Match, or an
    /// If-Modified-Since not older than the last update, yields 304.
    pub fn check_read(&self, record: &StoredRecord) -> RestResult<()> {
        self.check_if_match(record)?;

        let etag = record.etag();
        if let Some(condition) = self.if_none_match() {
            if etag_matches(condition, &etag) {
                debug!(etag = %etag, "Returning 304 Not Modified");
                return Err(RestError::NotModified { etag });
            }
            return Ok(());
        }

        if let Some(since) = self.if_modified_since() {
            // HTTP dates carry whole seconds
            if record.updated().timestamp() <= since.timestamp() {
                debug!(since = %since, "Record not modified since");
                return Err(RestError::NotModified { etag });
            }
        }
        Ok(())
    }
}

/// Returns whether an If-Match / If-None-Match value matches `etag`.
///
/// Accepts `*`, comma-separated lists and weak (`W/`) tags.
pub fn etag_matches(condition: &str, etag: &str) -> bool {
    let etag = strip_weak(etag.trim());
    condition.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || (!candidate.is_empty() && strip_weak(candidate) == etag)
    })
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// Axum extractor for conditional headers.
impl<S> FromRequestParts<S> for ConditionalHeaders
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ConditionalHeaders::from_headers(&parts.headers))
    }
}
