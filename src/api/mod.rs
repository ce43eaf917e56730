//! HTTP surface for the live status monitor
//!
//! Serves the monitor's three operations over HTTP, plus a health probe.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **MonitorHandle** in shared state for every query
//! - **Server-Sent Events** for streaming samples to dashboards
//!
//! ## Endpoints
//!
//! - `GET /api/stats` - Latest sample
//! - `GET /api/history` - Rolling history plus latest
//! - `GET /sse` - Event stream of samples with `: ping` heartbeats
//! - `GET /api/v1/health` - Health check (never requires the access key)

pub mod error;
pub mod middleware;
pub mod routes;
pub mod sse;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiSettings;
use middleware::auth::{AccessKey, auth_middleware};

/// Build the router with every route and the configured middleware
pub fn router(settings: &ApiSettings, state: ApiState) -> Router {
    let mut monitored: Router<ApiState> = Router::new()
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/history", get(routes::history::get_history))
        .route("/sse", get(sse::sse_handler));

    // Health probes stay reachable without the key
    if let Some(key) = &settings.access_key {
        monitored = monitored.route_layer(axum::middleware::from_fn_with_state(
            AccessKey::new(key),
            auth_middleware,
        ));
    }

    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .merge(monitored)
        .fallback(routes::not_found)
        .with_state(state);

    app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if settings.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(settings: ApiSettings, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", settings.bind_addr);

    let app = router(&settings, state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!(
        "API server listening on {} (access key {})",
        addr,
        if settings.access_key.is_some() { "required" } else { "not required" }
    );

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
