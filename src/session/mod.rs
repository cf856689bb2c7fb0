//! Request-scoped session.
//!
//! # Lifecycle
//! ```text
//! extract (Authorization: Bearer / access_token cookie)
//!     → verify (GET users/me through the forwarder)
//!     → clear (logout drops token and user)
//! ```
//!
//! # Design Decisions
//! - A session is a value extracted per request, never a global
//! - Verification goes through the same forwarder as `/api/proxy`, so the
//!   upstream sees an identical call

pub mod cookies;
pub mod handlers;

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
};
use serde_json::Value;

use crate::gateway::auth;
use crate::gateway::error::GatewayResult;
use crate::gateway::forward::{Forwarder, UpstreamCall};
use crate::http::server::AppState;

/// Result of verifying a session against the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Upstream accepted the token; the user document is stored.
    Verified,
    /// No usable token on the request.
    MissingToken,
    /// Upstream refused the token with this status.
    Rejected(StatusCode),
    /// Upstream accepted the token but the user document was not JSON.
    UnreadableUser(StatusCode),
}

/// Bearer token and, once verified, the current user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    user: Option<Value>,
}

impl Session {
    /// Read the token from `Authorization: Bearer`, falling back to the
    /// access-token cookie.
    pub fn from_headers(headers: &HeaderMap, access_cookie: &str) -> Self {
        let token = bearer_token(headers).or_else(|| cookies::find_cookie(headers, access_cookie));
        Self { token, user: None }
    }

    /// Session carrying the given token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    /// Ask the upstream who the token belongs to.
    pub async fn verify(&mut self, forwarder: &Forwarder, verify_path: &str) -> GatewayResult<Verification> {
        self.user = None;

        let Some(authorization) = self.token.as_deref().and_then(auth::bearer) else {
            return Ok(Verification::MissingToken);
        };

        let mut call = UpstreamCall::new(Method::GET, verify_path);
        call.authorization = Some(authorization);

        let upstream = forwarder.send(call).await?;
        let status = upstream.status();
        if !status.is_success() {
            return Ok(Verification::Rejected(status));
        }

        let body = upstream.bytes().await?;
        match serde_json::from_slice::<Value>(&body) {
            Ok(user) => {
                self.user = Some(user);
                Ok(Verification::Verified)
            }
            Err(e) => {
                tracing::warn!(upstream_status = %status, error = %e, "User document is not JSON");
                Ok(Verification::UnreadableUser(status))
            }
        }
    }

    /// Drop the token and any verified user.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Session::from_headers(&parts.headers, &state.config.session.access_cookie))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
