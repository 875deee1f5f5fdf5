//! HTTP response assertions.
//!
//! Provides assertion utilities for testing HTTP responses.

use axum_test::TestResponse;
use jsonpath_rust::JsonPathQuery;
use regex::Regex;
use serde_json::Value;

/// Asserts that the response has the expected status code.
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status_code().as_u16();
    assert_eq!(
        actual,
        expected,
        "Expected status {}, got {}: {}",
        expected,
        actual,
        response.text()
    );
}

/// Asserts an error body with the given status and message.
pub fn assert_error(response: &TestResponse, status: u16, message: &str) {
    assert_status(response, status);
    let body: Value = response.json();
    assert_eq!(body["status"], status, "Unexpected error body: {}", body);
    assert_eq!(body["message"], message, "Unexpected error body: {}", body);
}

/// Asserts that the response has the given header value.
pub fn assert_header(response: &TestResponse, name: &str, expected: &str) {
    let actual = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Expected {} header", name));
    assert_eq!(actual.to_str().unwrap(), expected, "Unexpected {} header", name);
}

/// Asserts that the response has no header of that name.
pub fn assert_no_header(response: &TestResponse, name: &str) {
    assert!(
        response.headers().get(name).is_none(),
        "Unexpected {} header",
        name
    );
}

/// Returns every value a JSON path selects.
pub fn select(body: &Value, path: &str) -> Vec<Value> {
    match body.clone().path(path).expect("valid JSON path") {
        Value::Array(values) => values,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Asserts the values a JSON path selects.
pub fn assert_json_path(body: &Value, path: &str, expected: &[Value]) {
    assert_eq!(
        select(body, path),
        expected,
        "Unexpected values at {} in {}",
        path,
        body
    );
}

/// Returns the link relations of a `Link` header, in order.
pub fn link_relations(response: &TestResponse) -> Vec<(String, String)> {
    let header = response
        .headers()
        .get("link")
        .expect("Expected Link header")
        .to_str()
        .unwrap()
        .to_string();
    let pattern = Regex::new(r#"<([^>]*)>; rel="([^"]+)""#).unwrap();
    pattern
        .captures_iter(&header)
        .map(|c| (c[2].to_string(), c[1].to_string()))
        .collect()
}
