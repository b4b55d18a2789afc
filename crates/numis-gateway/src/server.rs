// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use numis_config::model::GatewayConfig;
use numis_core::NumisError;
use numis_session::AuthService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<AuthService>,
    pub auth: AuthConfig,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(service: Arc<AuthService>, bearer_token: Option<String>) -> Self {
        Self {
            service,
            auth: AuthConfig { bearer_token },
            start_time: std::time::Instant::now(),
        }
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Assemble the router:
/// - `GET /health` (public)
/// - `/v1/...` request and session routes (bearer auth)
/// - `GET /ws` (auth checked during the upgrade handshake)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/requests", post(handlers::create_request))
        .route("/v1/requests/pending", get(handlers::list_pending))
        .route("/v1/requests/{id}", get(handlers::get_request))
        .route("/v1/requests/{id}/claim", post(handlers::claim))
        .route("/v1/requests/{id}/reject", post(handlers::reject))
        .route("/v1/requests/{id}/end", post(handlers::end_session))
        .route(
            "/v1/sessions/{id}/messages",
            post(handlers::append_message).get(handlers::history),
        )
        .route("/v1/sessions/{id}/document", get(handlers::get_document))
        .route("/v1/ingest/chat", post(handlers::ingest_chat))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listener. Port 0 picks a free port.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, NumisError> {
    let addr = format!("{}:{}", config.host, config.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| NumisError::Config(format!("failed to bind gateway to {addr}: {e}")))
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), NumisError> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(addr = ?local, "gateway server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| NumisError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway server stopped");
    Ok(())
}

/// Bind and serve.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), NumisError> {
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_from_gateway_config() {
        let config = ServerConfig::from(&GatewayConfig::default());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
    }

    #[tokio::test]
    async fn bind_port_zero_picks_free_port() {
        let listener = bind(&ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        })
        .await
        .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
