//! Memento datetime negotiation (RFC 7089).
//!
//! An item route acts as its own TimeGate. A read carrying `Accept-Datetime`
//! is answered with the revision that was current at that time, and the
//! response gains `Memento-Datetime`, `Vary` and an `original timegate` link.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header, request::Parts},
};
use chrono::{DateTime, SubsecRound, Utc};
use pidrest_persistence::types::StoredRecord;

use crate::links::link_header;
use crate::responses::http_date;

/// Request header naming the wanted datetime.
pub const ACCEPT_DATETIME: HeaderName = HeaderName::from_static("accept-datetime");

/// Response header carrying the datetime of the served revision.
pub const MEMENTO_DATETIME: HeaderName = HeaderName::from_static("memento-datetime");

/// Parsed `Accept-Datetime` header.
///
/// An unparseable value is treated as absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptDatetime(Option<DateTime<Utc>>);

impl AcceptDatetime {
    /// Reads the header from a request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let at = headers
            .get(ACCEPT_DATETIME)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Self(at)
    }

    /// Returns the requested datetime.
    pub fn value(&self) -> Option<DateTime<Utc>> {
        self.0
    }
}

impl<S> FromRequestParts<S> for AcceptDatetime
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AcceptDatetime::from_headers(&parts.headers))
    }
}

/// Picks the revision that was current at `at` from a history, oldest first.
///
/// Update times are compared at second precision, the resolution of HTTP
/// dates. A datetime older than the whole history yields the first
/// revision. Deleted revisions are never served.
pub fn select_memento(revisions: &[StoredRecord], at: DateTime<Utc>) -> Option<&StoredRecord> {
    let live: Vec<&StoredRecord> = revisions.iter().filter(|r| !r.is_deleted()).collect();
    live.iter()
        .rev()
        .find(|r| r.updated().trunc_subsecs(0) <= at)
        .or(live.first())
        .copied()
}

/// Adds the memento headers for `memento` to a record response.
///
/// `original` is the item URL; it is appended to any existing Link header.
pub fn add_memento_headers(headers: &mut HeaderMap, memento: &StoredRecord, original: &str) {
    if let Ok(value) = HeaderValue::from_str(&http_date(memento.updated())) {
        headers.insert(MEMENTO_DATETIME, value);
    }
    headers.insert(header::VARY, HeaderValue::from_static("accept-datetime, accept"));

    let timegate = link_header([("original timegate", original)]);
    let link = match headers.get(header::LINK).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, timegate),
        None => timegate,
    };
    if let Ok(value) = HeaderValue::from_str(&link) {
        headers.insert(header::LINK, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn revision(number: u64, updated: DateTime<Utc>, title: &str) -> StoredRecord {
        StoredRecord::from_storage(
            Uuid::nil(),
            "records",
            number,
            json!({"title": title}),
            at("2015-10-21T07:28:00Z"),
            updated,
            false,
        )
    }

    fn history() -> Vec<StoredRecord> {
        vec![
            revision(1, at("2015-10-21T07:28:00.250Z"), "first"),
            revision(2, at("2015-10-22T09:00:00.900Z"), "second"),
        ]
    }

    #[test]
    fn test_select_memento() {
        let history = history();
        let title = |when| select_memento(&history, when).unwrap().payload()["title"].clone();

        assert_eq!(title(at("2015-10-20T00:00:00Z")), "first");
        assert_eq!(title(at("2015-10-21T07:28:00Z")), "first");
        assert_eq!(title(at("2015-10-22T08:59:59Z")), "first");
        assert_eq!(title(at("2015-10-22T09:00:00Z")), "second");
        assert_eq!(title(Utc::now() + Duration::days(1)), "second");
    }

    #[test]
    fn test_deleted_revisions_are_skipped() {
        let mut history = history();
        history.push(StoredRecord::from_storage(
            Uuid::nil(),
            "records",
            3,
            json!({"title": "second"}),
            at("2015-10-21T07:28:00Z"),
            at("2015-10-23T00:00:00Z"),
            true,
        ));

        let memento = select_memento(&history, at("2016-01-01T00:00:00Z")).unwrap();
        assert_eq!(memento.revision(), 2);
        assert!(select_memento(&[], Utc::now()).is_none());
    }

    #[test]
    fn test_accept_datetime_parsing() {
        let mut headers = HeaderMap::new();
        assert!(AcceptDatetime::from_headers(&headers).value().is_none());

        headers.insert(ACCEPT_DATETIME, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(
            AcceptDatetime::from_headers(&headers).value(),
            Some(at("2015-10-21T07:28:00Z"))
        );

        headers.insert(ACCEPT_DATETIME, HeaderValue::from_static("last tuesday"));
        assert!(AcceptDatetime::from_headers(&headers).value().is_none());
    }

    #[test]
    fn test_memento_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::LINK,
            HeaderValue::from_static("<http://localhost/records/1>; rel=\"self\""),
        );

        add_memento_headers(&mut headers, &history()[0], "http://localhost/records/1");

        assert_eq!(headers.get(MEMENTO_DATETIME).unwrap(), "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(headers.get(header::VARY).unwrap(), "accept-datetime, accept");
        assert_eq!(
            headers.get(header::LINK).unwrap(),
            "<http://localhost/records/1>; rel=\"self\", \
             <http://localhost/records/1>; rel=\"original timegate\""
        );
    }
}
