//! Response header generation.
//!
//! Provides the record response headers: ETag, Last-Modified, Location,
//! Link and Content-Type.

use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue, header};
use pidrest_persistence::types::StoredRecord;

/// Formats a timestamp as an HTTP date (IMF-fixdate).
pub fn http_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builder for record response headers.
#[derive(Debug, Default)]
pub struct RecordHeaders {
    /// ETag value (quoted revision).
    etag: Option<String>,
    /// Last-Modified timestamp.
    last_modified: Option<String>,
    /// Location URL (for created records).
    location: Option<String>,
    /// Link header value.
    link: Option<String>,
    /// Content-Type.
    content_type: Option<String>,
}

impl RecordHeaders {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates headers carrying the record's ETag and Last-Modified.
    pub fn from_record(record: &StoredRecord) -> Self {
        Self {
            etag: Some(record.etag()),
            last_modified: Some(http_date(record.updated())),
            ..Default::default()
        }
    }

    /// Sets the Location URL.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the Link header value.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let link = link.into();
        self.link = (!link.is_empty()).then_some(link);
        self
    }

    /// Sets the Content-Type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Converts to an Axum HeaderMap.
    ///
    /// Values that are not valid header values are skipped.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let entries = [
            (header::CONTENT_TYPE, &self.content_type),
            (header::ETAG, &self.etag),
            (header::LAST_MODIFIED, &self.last_modified),
            (header::LOCATION, &self.location),
            (header::LINK, &self.link),
        ];
        for (name, value) in entries {
            if let Some(value) = value.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(name, value);
            }
        }
        headers
    }

    /// Returns the ETag value.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Returns the Last-Modified value.
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// Returns the Location value.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_http_date() {
        let ts = DateTime::parse_from_rfc3339("2015-10-21T07:28:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(http_date(ts), "Wed, 21 Oct 2015 07:28:00 GMT");
    }

    #[test]
    fn test_from_record() {
        let now = Utc::now();
        let record = StoredRecord::from_storage(Uuid::nil(), "records", 3, json!({}), now, now, false);
        let headers = RecordHeaders::from_record(&record)
            .with_location("http://localhost/records/1")
            .with_content_type("application/json")
            .to_header_map();

        assert_eq!(headers.get(header::ETAG).unwrap(), "\"3\"");
        assert_eq!(headers.get(header::LOCATION).unwrap(), "http://localhost/records/1");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.contains_key(header::LAST_MODIFIED));
        assert!(!headers.contains_key(header::LINK));
    }

    #[test]
    fn test_empty_link_is_omitted() {
        let headers = RecordHeaders::new().with_link("").to_header_map();
        assert!(headers.is_empty());
    }
}
