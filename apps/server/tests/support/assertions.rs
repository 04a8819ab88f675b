use anyhow::Context as _;
use axum::http::StatusCode;
use folio::models::SearchResponse;
use serde_json::Value;

pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(actual, expected, "{context}: unexpected status");
}

/// Ids of the items on a page, in order.
pub fn ids(response: &SearchResponse) -> Vec<String> {
    response
        .data
        .iter()
        .filter_map(|item| item.get("id").and_then(Value::as_str).map(str::to_string))
        .collect()
}

/// Ids across several pages, in order.
pub fn ids_across(pages: &[SearchResponse]) -> Vec<String> {
    pages.iter().flat_map(ids).collect()
}

/// Unwraps `{ "success": true, "data": ... }`.
pub fn envelope_data(body: &[u8]) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_slice(body).context("parse response body")?;
    assert_eq!(
        value.get("success").and_then(Value::as_bool),
        Some(true),
        "expected success envelope, got {value}"
    );
    value.get("data").cloned().context("envelope data")
}

/// Unwraps `{ "success": false, "error": { "code", "message" } }`, returning the code.
pub fn envelope_error_code(body: &[u8]) -> anyhow::Result<String> {
    let value: Value = serde_json::from_slice(body).context("parse response body")?;
    assert_eq!(
        value.get("success").and_then(Value::as_bool),
        Some(false),
        "expected error envelope, got {value}"
    );
    value
        .pointer("/error/code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("error code")
}

pub fn item_ids(data: &Value) -> Vec<String> {
    data.get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.get("id").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
