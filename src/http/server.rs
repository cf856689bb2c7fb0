//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, request ID)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::gateway::client::build_client;
use crate::gateway::handler::forward;
use crate::gateway::image::proxy_image;
use crate::gateway::{Forwarder, UrlNormalizer};
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::session::handlers as session;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub forwarder: Forwarder,
}

impl AppState {
    /// Build state (and the upstream client) from a validated config.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(&config.upstream)?;
        let urls = UrlNormalizer::new(&config.upstream.base_url, &config.upstream.static_prefix);

        Ok(Self {
            config: Arc::new(config),
            forwarder: Forwarder::new(client, urls),
        })
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    state: AppState,
}

impl GatewayServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let state = AppState::new(config)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        let body_limit = state.config.limits.max_body_bytes;

        Router::new()
            .route(
                "/api/proxy/image",
                get(proxy_image).post(forward).patch(forward).delete(forward),
            )
            .route("/api/proxy/", proxy_routes())
            .route("/api/proxy/{*path}", proxy_routes())
            .route("/api/auth/verify", get(session::verify))
            .route("/api/auth/logout", post(session::logout))
            .route("/healthz", get(healthz))
            .with_state(state)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.state.forwarder.urls().base(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn proxy_routes() -> MethodRouter<AppState> {
    get(forward).post(forward).patch(forward).delete(forward)
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
