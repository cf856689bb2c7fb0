use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};

use crate::gateway::error::message_response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::session::cookies::expired_cookie;
use crate::session::{Session, Verification};

/// `GET /api/auth/verify`: resolve the caller's token to the current user.
pub async fn verify(State(state): State<AppState>, mut session: Session) -> Response {
    let start = Instant::now();

    let response = match session
        .verify(&state.forwarder, &state.config.session.verify_path)
        .await
    {
        Ok(Verification::Verified) => {
            let user = session.user().cloned().unwrap_or_default();
            (StatusCode::OK, Json(serde_json::json!({ "user": user }))).into_response()
        }
        Ok(Verification::MissingToken) => {
            message_response(StatusCode::UNAUTHORIZED, "No token provided")
        }
        Ok(Verification::Rejected(status)) => {
            tracing::warn!(upstream_status = %status, "Token rejected by upstream");
            message_response(StatusCode::UNAUTHORIZED, "Invalid or expired token")
        }
        Ok(Verification::UnreadableUser(status)) => {
            tracing::warn!(upstream_status = %status, "Token accepted but user unreadable");
            message_response(StatusCode::UNAUTHORIZED, "Could not read the current user")
        }
        Err(e) => {
            tracing::error!(method = "GET", error = %e, "Token verification failed");
            e.into_response()
        }
    };

    metrics::record_request("GET", response.status().as_u16(), "verify", start);
    response
}

/// `POST /api/auth/logout`: expire both session cookies.
pub async fn logout(State(state): State<AppState>, mut session: Session) -> Response {
    let start = Instant::now();
    let had_token = session.token().is_some();
    session.clear();

    let config = &state.config.session;
    let cookies: Vec<_> = [&config.access_cookie, &config.refresh_cookie]
        .into_iter()
        .filter_map(|name| expired_cookie(name, config.secure_cookies))
        .map(|value| (header::SET_COOKIE, value))
        .collect();

    tracing::info!(had_token, "Session cleared");

    let response = (
        StatusCode::OK,
        AppendHeaders(cookies),
        Json(serde_json::json!({ "message": "Logged out" })),
    )
        .into_response();

    metrics::record_request("POST", response.status().as_u16(), "logout", start);
    response
}
