//! Upstream response classification and rendering.
//!
//! # Decision Table (first match wins)
//! ```text
//! spreadsheet | octet-stream | pdf | image/*  → Binary
//! *application/json*                         → Json
//! status 204                                 → NoContent
//! anything else                              → Unrecognized
//! ```
//!
//! The kind is decided once from status and content type, then rendered by a
//! single `match`.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::gateway::error::{GatewayError, GatewayResult};

/// Spreadsheet exports produced by the reports screens.
pub const SPREADSHEET_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const BINARY_TYPES: [&str; 3] = [SPREADSHEET_MIME, "application/octet-stream", "application/pdf"];

/// How an upstream response is turned into the outbound response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Bytes passed through with an attachment disposition.
    Binary,
    /// JSON passed through, empty bodies become `{}`.
    Json,
    /// Bare 204.
    NoContent,
    /// Unknown content type, wrapped as a diagnostic object.
    Unrecognized,
}

impl ResponseKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Binary => "binary",
            ResponseKind::Json => "json",
            ResponseKind::NoContent => "no_content",
            ResponseKind::Unrecognized => "unrecognized",
        }
    }
}

/// Decide the response kind from the upstream content type and status.
pub fn classify(content_type: Option<&str>, status: StatusCode) -> ResponseKind {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    let essence = mime_essence(&content_type);

    if BINARY_TYPES.contains(&essence) || essence.starts_with("image/") {
        ResponseKind::Binary
    } else if content_type.contains("application/json") {
        ResponseKind::Json
    } else if status == StatusCode::NO_CONTENT {
        ResponseKind::NoContent
    } else {
        ResponseKind::Unrecognized
    }
}

/// Render an upstream response according to its kind.
pub async fn render(kind: ResponseKind, upstream: reqwest::Response) -> GatewayResult<Response> {
    let status = upstream.status();

    match kind {
        ResponseKind::Binary => {
            let content_type = upstream
                .headers()
                .get(header::CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
            let disposition = upstream
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .cloned()
                .unwrap_or_else(|| default_disposition(content_type.to_str().unwrap_or_default()));

            let bytes = upstream.bytes().await?;

            Ok((
                status,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CONTENT_LENGTH, HeaderValue::from(bytes.len())),
                ],
                Body::from(bytes),
            )
                .into_response())
        }
        ResponseKind::Json => {
            let text = upstream.text().await?;
            if text.trim().is_empty() {
                return Ok((status, Json(serde_json::json!({}))).into_response());
            }

            let value: serde_json::Value =
                serde_json::from_str(&text).map_err(GatewayError::UpstreamJson)?;
            Ok((status, Json(value)).into_response())
        }
        ResponseKind::NoContent => Ok(StatusCode::NO_CONTENT.into_response()),
        ResponseKind::Unrecognized => {
            let content_type = upstream
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("<none>")
                .to_string();
            let text = upstream.text().await?;

            tracing::warn!(
                status = %status,
                content_type = %content_type,
                body = %text,
                "Unexpected upstream content type"
            );

            let body = serde_json::json!({
                "message": "Unexpected response from upstream",
                "content_type": content_type,
                "raw": text,
            });
            Ok((status, Json(body)).into_response())
        }
    }
}

/// The type/subtype part of a content type, without parameters.
fn mime_essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Attachment disposition used when the upstream did not send one.
pub fn default_disposition(content_type: &str) -> HeaderValue {
    let essence = mime_essence(content_type).to_ascii_lowercase();
    let file_name = match essence.as_str() {
        SPREADSHEET_MIME => "export.xlsx".to_string(),
        "application/pdf" => "document.pdf".to_string(),
        image if image.starts_with("image/") => {
            let ext = image.trim_start_matches("image/");
            let ext = ext.split('+').next().unwrap_or("img");
            format!("image.{}", if ext == "jpeg" { "jpg" } else { ext })
        }
        _ => "download.bin".to_string(),
    };

    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_types() {
        for ct in [
            SPREADSHEET_MIME,
            "application/octet-stream",
            "application/pdf",
            "image/png",
            "image/svg+xml",
            "IMAGE/JPEG",
        ] {
            assert_eq!(classify(Some(ct), StatusCode::OK), ResponseKind::Binary, "{}", ct);
        }
    }

    #[test]
    fn test_json_wins_over_no_content() {
        assert_eq!(
            classify(Some("application/json; charset=utf-8"), StatusCode::NO_CONTENT),
            ResponseKind::Json
        );
        assert_eq!(
            classify(Some("application/problem+json"), StatusCode::BAD_REQUEST),
            ResponseKind::Unrecognized
        );
    }

    #[test]
    fn test_no_content_without_type() {
        assert_eq!(classify(None, StatusCode::NO_CONTENT), ResponseKind::NoContent);
        assert_eq!(
            classify(Some("text/plain"), StatusCode::NO_CONTENT),
            ResponseKind::NoContent
        );
    }

    #[test]
    fn test_unrecognized_fallback() {
        assert_eq!(classify(Some("text/html"), StatusCode::OK), ResponseKind::Unrecognized);
        assert_eq!(classify(None, StatusCode::BAD_GATEWAY), ResponseKind::Unrecognized);
    }

    #[test]
    fn test_default_disposition_names() {
        assert_eq!(
            default_disposition(SPREADSHEET_MIME),
            "attachment; filename=\"export.xlsx\""
        );
        assert_eq!(
            default_disposition("image/jpeg"),
            "attachment; filename=\"image.jpg\""
        );
        assert_eq!(
            default_disposition("image/svg+xml"),
            "attachment; filename=\"image.svg\""
        );
        assert_eq!(
            default_disposition("application/octet-stream"),
            "attachment; filename=\"download.bin\""
        );
    }
}
