//! Token extraction for authenticated operations.
//!
//! Requests carry their token either in a `token` header or as an
//! `Authorization: Bearer` header. Subscription connections carry it in the
//! `token` field of their connection parameters.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde_json::Value;

pub const TOKEN_HEADER: &str = "token";
pub const TOKEN_PARAM: &str = "token";

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
        })?
        .trim();

    (!token.is_empty()).then(|| token.to_string())
}

pub fn token_from_params(params: &Value) -> Option<String> {
    params
        .get(TOKEN_PARAM)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
