//! Authorization header relay.
//!
//! The gateway never looks inside the token; the upstream owns verification.

use axum::http::{header, HeaderMap, HeaderValue};
use reqwest::RequestBuilder;

/// The caller's `Authorization` header, byte-for-byte.
pub fn relayed_authorization(headers: &HeaderMap) -> Option<HeaderValue> {
    headers.get(header::AUTHORIZATION).cloned()
}

/// Set `Authorization` on the upstream request when the caller sent one.
pub fn relay(builder: RequestBuilder, authorization: Option<HeaderValue>) -> RequestBuilder {
    match authorization {
        Some(value) => builder.header(header::AUTHORIZATION, value),
        None => builder,
    }
}

/// `Authorization: Bearer <token>` for a raw token.
pub fn bearer(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {}", token)).ok()
}
