//! Inbound body decoding.
//!
//! # Responsibilities
//! - Decide whether a body is forwarded at all (verb, content length)
//! - Re-serialize JSON bodies and pin `Content-Type: application/json`
//! - Rebuild multipart forms so the client writes its own boundary
//! - Forward anything else as raw bytes
//!
//! # Design Decisions
//! - Content length is checked before content type: an empty body is never
//!   forwarded, whatever it claims to be
//! - Multipart never gets an explicit `Content-Type`; a hand-set header would
//!   not match the boundary reqwest generates

use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header, HeaderMap, HeaderValue, Method, Request},
};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;

use crate::gateway::error::{GatewayError, GatewayResult};

const JSON: &str = "application/json";
const MULTIPART: &str = "multipart/form-data";

/// Body representation sent to the upstream.
#[derive(Debug)]
pub enum OutboundBody {
    /// No body attached.
    Empty,
    /// Re-serialized JSON text.
    Json(String),
    /// Bytes forwarded verbatim.
    Raw(Bytes),
    /// Rebuilt multipart form.
    Multipart(Form),
}

impl OutboundBody {
    /// Attach the body (and, for JSON only, its content type) to a request.
    pub fn apply(self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            OutboundBody::Empty => builder,
            OutboundBody::Json(text) => builder
                .header(reqwest::header::CONTENT_TYPE, HeaderValue::from_static(JSON))
                .body(text),
            OutboundBody::Raw(bytes) => builder.body(bytes),
            OutboundBody::Multipart(form) => builder.multipart(form),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundBody::Empty => "empty",
            OutboundBody::Json(_) => "json",
            OutboundBody::Raw(_) => "raw",
            OutboundBody::Multipart(_) => "multipart",
        }
    }
}

/// True for verbs whose body is forwarded.
pub fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PATCH
}

/// Declared content length, when it is a positive integer.
pub fn positive_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|len| *len > 0)
}

/// Declared content type, lowercased.
pub fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
}

/// Turn an inbound request body into its outbound representation.
pub async fn decode_body(request: Request<Body>, limit: usize) -> GatewayResult<OutboundBody> {
    if !carries_body(request.method()) || positive_content_length(request.headers()).is_none() {
        return Ok(OutboundBody::Empty);
    }

    let declared = content_type(request.headers()).unwrap_or_default();

    if declared.contains(JSON) {
        let bytes = read_bytes(request, limit).await?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(GatewayError::InboundJson)?;
        let text = serde_json::to_string(&value).map_err(GatewayError::InboundJson)?;
        return Ok(OutboundBody::Json(text));
    }

    if declared.contains(MULTIPART) {
        let form = rebuild_multipart(request).await?;
        return Ok(OutboundBody::Multipart(form));
    }

    let bytes = read_bytes(request, limit).await?;
    Ok(OutboundBody::Raw(bytes))
}

async fn read_bytes(request: Request<Body>, limit: usize) -> GatewayResult<Bytes> {
    axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|e| GatewayError::Body(e.to_string()))
}

async fn rebuild_multipart(request: Request<Body>) -> GatewayResult<Form> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| GatewayError::Multipart(e.body_text()))?;

    let mut form = Form::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::Multipart(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let mime = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| GatewayError::Multipart(e.body_text()))?;

        let mut part = Part::bytes(data.to_vec());
        if let Some(file_name) = file_name {
            part = part.file_name(file_name);
        }
        if let Some(mime) = mime {
            part = part.mime_str(&mime)?;
        }

        form = form.part(name, part);
    }

    Ok(form)
}
