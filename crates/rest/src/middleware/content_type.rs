//! Content negotiation.
//!
//! Response serializers are picked from the `Accept` header against an
//! endpoint's media-type table; request loaders are picked by the request
//! `Content-Type`, ignoring its parameters.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use http::{HeaderMap, header};
use mime::Mime;

use crate::error::{RestError, RestResult};

/// Media type of JSON Patch documents.
pub const JSON_PATCH_MEDIA_TYPE: &str = "application/json-patch+json";

/// Returns the lowercased media type without parameters.
pub fn media_type_essence(value: &str) -> String {
    match value.trim().parse::<Mime>() {
        Ok(media_type) => media_type.essence_str().to_ascii_lowercase(),
        Err(_) => value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase(),
    }
}

/// Returns true for a bare `type/subtype` media type.
pub fn is_media_type(value: &str) -> bool {
    value.parse::<Mime>().is_ok_and(|media_type| {
        media_type.params().next().is_none() && media_type.essence_str() == value.to_ascii_lowercase()
    })
}

/// Returns the request `Content-Type` essence, if present.
pub fn request_content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_type_essence)
        .filter(|ct| !ct.is_empty())
}

/// Selects the entry of `available` keyed by the request content type.
///
/// # Errors
///
/// `UnsupportedMediaType` with the content type as sent.
pub fn select_by_content_type<'a, T>(
    headers: &HeaderMap,
    available: &'a BTreeMap<String, T>,
) -> RestResult<&'a T> {
    let content_type = request_content_type(headers);
    content_type
        .as_deref()
        .and_then(|ct| available.get(ct))
        .ok_or_else(|| RestError::UnsupportedMediaType {
            content_type: content_type.unwrap_or_default(),
        })
}

/// One media range of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
struct MediaRange {
    essence: String,
    quality: f32,
}

fn parse_accept(accept: &str) -> Vec<MediaRange> {
    let mut ranges: Vec<MediaRange> = accept
        .split(',')
        .filter_map(|part| {
            let mut params = part.split(';');
            let essence = params.next()?.trim().to_ascii_lowercase();
            if essence.is_empty() {
                return None;
            }
            let quality = params
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            Some(MediaRange { essence, quality })
        })
        .filter(|range| range.quality > 0.0)
        .collect();
    // stable: equal qualities keep header order
    ranges.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
    ranges
}

/// Negotiates a response media type.
///
/// Without an `Accept` header the default media type is used. `*/*` selects
/// the default; `type/*` prefers the default, then the first match.
///
/// # Errors
///
/// `NotAcceptable` when no offered media type is acceptable.
pub fn negotiate<'a, T>(
    headers: &HeaderMap,
    available: &'a BTreeMap<String, T>,
    default_media_type: &str,
) -> RestResult<(&'a str, &'a T)> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|accept| !accept.is_empty());

    let default = available.get_key_value(default_media_type);
    let Some(accept) = accept else {
        return default
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| not_acceptable(default_media_type));
    };

    for range in parse_accept(accept) {
        let found = if range.essence == "*/*" {
            default
        } else if let Some(major) = range.essence.strip_suffix("/*") {
            let prefix = format!("{}/", major);
            default
                .filter(|(key, _)| key.starts_with(&prefix))
                .or_else(|| available.iter().find(|(key, _)| key.starts_with(&prefix)))
        } else {
            available.get_key_value(&range.essence)
        };
        if let Some((key, value)) = found {
            return Ok((key.as_str(), value));
        }
    }
    Err(not_acceptable(accept))
}

fn not_acceptable(accept: &str) -> RestError {
    RestError::NotAcceptable {
        accept: accept.to_string(),
    }
}
