//! External image proxy.
//!
//! `GET /api/proxy/image?url=<absolute-url>&token=<bearer>` fetches an image
//! from anywhere (not only the upstream API) and streams it back. Used by
//! screens that embed avatars and certificates hosted behind auth.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use url::Url;

use crate::gateway::auth;
use crate::gateway::error::{message_response, GatewayResult};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Query parameters of the image proxy.
#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub url: Option<String>,
    pub token: Option<String>,
}

/// Fetch and stream an external image.
pub async fn proxy_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Response {
    let start = Instant::now();

    let response = match fetch_image(&state, query).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(method = "GET", error = %e, "Image proxy failed");
            e.into_response()
        }
    };

    metrics::record_request("GET", response.status().as_u16(), "image", start);
    response
}

async fn fetch_image(state: &AppState, query: ImageQuery) -> GatewayResult<Response> {
    let Some(raw_url) = query.url.filter(|u| !u.trim().is_empty()) else {
        tracing::warn!("Image proxy called without url");
        return Ok(message_response(
            StatusCode::BAD_REQUEST,
            "Missing required url parameter",
        ));
    };

    let target = match parse_image_url(&raw_url) {
        Some(url) => url,
        None => {
            tracing::warn!(url = %raw_url, "Image proxy called with invalid url");
            return Ok(message_response(
                StatusCode::BAD_REQUEST,
                "The url parameter must be an absolute http(s) URL",
            ));
        }
    };

    let authorization = match query.token.filter(|t| !t.is_empty()) {
        Some(token) => match auth::bearer(&token) {
            Some(value) => Some(value),
            None => {
                tracing::warn!(url = %target, "Image proxy called with unusable token");
                return Ok(message_response(
                    StatusCode::BAD_REQUEST,
                    "The token parameter is not a valid bearer token",
                ));
            }
        },
        None => None,
    };

    let builder = auth::relay(state.forwarder.client().get(target.clone()), authorization);

    let upstream = builder.send().await?;
    let status = upstream.status();
    if !status.is_success() {
        tracing::warn!(url = %target, status = %status, "Image fetch rejected");
        return Ok(message_response(status, "Failed to fetch image"));
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .filter(|ct| is_image(ct));
    let Some(content_type) = content_type else {
        tracing::warn!(url = %target, "Image proxy target is not an image");
        return Ok(message_response(
            StatusCode::BAD_REQUEST,
            "The url does not point to an image",
        ));
    };

    let cache_control = HeaderValue::from_str(&format!(
        "public, max-age={}",
        state.config.image.cache_max_age_secs
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));
    let content_length = upstream.content_length();

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, cache_control),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response();

    if let Some(len) = content_length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok(response)
}

fn parse_image_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

fn is_image(content_type: &HeaderValue) -> bool {
    content_type
        .to_str()
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_url() {
        assert!(parse_image_url("https://cdn.institute.test/avatars/1.png").is_some());
        assert!(parse_image_url("/avatars/1.png").is_none());
        assert!(parse_image_url("file:///etc/passwd").is_none());
        assert!(parse_image_url("data:image/png;base64,AAAA").is_none());
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(&HeaderValue::from_static("image/webp")));
        assert!(is_image(&HeaderValue::from_static("Image/PNG")));
        assert!(!is_image(&HeaderValue::from_static("text/html; charset=utf-8")));
    }
}
