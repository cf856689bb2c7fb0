//! Per-verb gateway entry points.
//!
//! # Phases
//! ```text
//! resolve path → reject dot segments → extract auth/content type → decode body
//!     → upstream URL → single upstream call → classify → respond
//! ```
//!
//! Any error in these phases ends here as a 500 JSON response; nothing
//! escapes the handler.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::gateway::auth;
use crate::gateway::body::decode_body;
use crate::gateway::error::{message_response, GatewayResult};
use crate::gateway::forward::UpstreamCall;
use crate::gateway::url::has_dot_segment;
use crate::http::request::X_REQUEST_ID;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Mount point of the gateway.
pub const PROXY_PREFIX: &str = "/api/proxy";

/// Forward GET, POST, PATCH and DELETE under `/api/proxy/`.
pub async fn forward(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = resource_path(request.uri()).to_string();

    let response = if has_dot_segment(&path) {
        tracing::warn!(method = %method, path = %path, "Rejected path with dot segment");
        message_response(StatusCode::BAD_REQUEST, "Invalid resource path")
    } else {
        match run(&state, &path, request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    method = %method,
                    path = %path,
                    error = %e,
                    "Proxy request failed"
                );
                e.into_response()
            }
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), "proxy", start);
    response
}

async fn run(state: &AppState, path: &str, request: Request<Body>) -> GatewayResult<Response> {
    let method = request.method().clone();
    let query = request.uri().query().map(str::to_string);
    let authorization = auth::relayed_authorization(request.headers());
    let request_id = request.headers().get(X_REQUEST_ID).cloned();

    let body = decode_body(request, state.config.limits.max_body_bytes).await?;

    let call = UpstreamCall {
        method,
        path,
        query: query.as_deref(),
        authorization,
        request_id,
        body,
    };

    state.forwarder.forward(call).await
}

/// The resource path below the gateway mount point, without leading slash.
///
/// The raw (still percent-encoded) path is used so the upstream sees the
/// same bytes the browser sent.
pub fn resource_path(uri: &Uri) -> &str {
    let path = uri.path();
    path.strip_prefix(PROXY_PREFIX)
        .unwrap_or(path)
        .trim_start_matches('/')
}
