//! Single-shot forwarding to the upstream API.
//!
//! # Responsibilities
//! - Compute the upstream URL for a resource path
//! - Issue exactly one upstream call (no retries, no fan-out)
//! - Relay `Authorization` and `x-request-id`
//! - Classify and render the upstream response

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    response::Response,
};
use reqwest::Client;

use crate::gateway::auth;
use crate::gateway::body::OutboundBody;
use crate::gateway::classify::{classify, render};
use crate::gateway::error::GatewayResult;
use crate::gateway::url::UrlNormalizer;
use crate::http::request::X_REQUEST_ID;

/// One outbound call, fully decoded.
#[derive(Debug)]
pub struct UpstreamCall<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub authorization: Option<HeaderValue>,
    pub request_id: Option<HeaderValue>,
    pub body: OutboundBody,
}

impl<'a> UpstreamCall<'a> {
    /// A bodiless call with no query string.
    pub fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            query: None,
            authorization: None,
            request_id: None,
            body: OutboundBody::Empty,
        }
    }
}

/// Shared forwarding client, cheap to clone.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
    urls: Arc<UrlNormalizer>,
}

impl Forwarder {
    /// Create a forwarder from a client and URL normalizer.
    pub fn new(client: Client, urls: UrlNormalizer) -> Self {
        Self {
            client,
            urls: Arc::new(urls),
        }
    }

    /// The underlying client, for calls that bypass URL normalization.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The URL normalizer in use.
    pub fn urls(&self) -> &UrlNormalizer {
        &self.urls
    }

    /// Send the call upstream and return the raw response.
    pub async fn send(&self, call: UpstreamCall<'_>) -> GatewayResult<reqwest::Response> {
        let target = self.urls.target_with_query(call.path, call.query);

        tracing::debug!(
            method = %call.method,
            target = %target,
            body = call.body.kind(),
            "Forwarding to upstream"
        );

        let mut builder = self.client.request(call.method, target);
        builder = auth::relay(builder, call.authorization);
        if let Some(request_id) = call.request_id {
            builder = builder.header(X_REQUEST_ID, request_id);
        }
        builder = call.body.apply(builder);

        Ok(builder.send().await?)
    }

    /// Send the call upstream and render the classified response.
    pub async fn forward(&self, call: UpstreamCall<'_>) -> GatewayResult<Response> {
        let upstream = self.send(call).await?;

        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let kind = classify(content_type.as_deref(), upstream.status());

        tracing::debug!(
            status = %upstream.status(),
            kind = kind.as_str(),
            "Upstream responded"
        );

        render(kind, upstream).await
    }
}
