//! Deterministic response encoding shared by all handlers.

use serde_json::Value;

use shared_types::{Response, StoreError};

/// Encode a store failure with the fixed status mapping.
pub fn store_error(err: &StoreError) -> Response {
    Response::error(err.http_status(), &err.to_string())
}

/// Parse a JSON request body; a parse failure is a client error.
pub fn parse_body(body: &str) -> Result<Value, Response> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|_| Response::error(400, "Request body is not valid JSON"))
}

/// Extract a required string field from a parsed body.
pub fn require_str<'a>(body: &'a Value, field: &str) -> Result<&'a str, Response> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Response::error(400, &format!("Missing required field: {field}")))
}

/// Extract a required boolean field from a parsed body.
pub fn require_bool(body: &Value, field: &str) -> Result<bool, Response> {
    body.get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| Response::error(400, &format!("Missing required field: {field}")))
}

/// Extract an optional string-list field; absent means empty.
pub fn string_list(body: &Value, field: &str) -> Result<Vec<String>, Response> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Response::error(400, &format!("Field {field} must be a string list")))
            })
            .collect(),
        Some(_) => Err(Response::error(
            400,
            &format!("Field {field} must be a string list"),
        )),
    }
}
