// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The HTTP layer is thin
//! glue: every handler delegates straight into the engine or the store.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use leadflow_core::{LeadStore, LeadflowError};
use leadflow_engine::{Distributor, NotificationHub, PresenceTracker};
use leadflow_ingest::DropFolderWatcher;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;
use crate::sse;

/// Health state for the unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn LeadStore>,
    pub distributor: Arc<Distributor>,
    pub presence: Arc<PresenceTracker>,
    pub hub: Arc<NotificationHub>,
    /// Present when the drop-folder watcher is enabled; powers the admin
    /// sweep trigger and ingest stats.
    pub ingest: Option<Arc<DropFolderWatcher>>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors ServerConfig from leadflow-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the full gateway router.
pub fn build_router(state: GatewayState) -> Router {
    // Unauthenticated public routes (health + metrics for systemd and
    // Prometheus).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    // Agent-facing routes requiring authentication.
    let agent_routes = Router::new()
        .route("/v1/presence", post(handlers::post_presence))
        .route("/v1/presence/heartbeat", post(handlers::post_heartbeat))
        .route("/v1/leads", get(handlers::get_my_leads))
        .route("/v1/leads/{id}/confirm", post(handlers::post_confirm))
        .route("/v1/leads/{id}/discard", post(handlers::post_discard))
        .route("/v1/leads/{id}/requeue", post(handlers::post_requeue))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    // Administrative surface.
    let admin_routes = Router::new()
        .route("/v1/admin/agents/online", get(admin::get_agents_online))
        .route(
            "/v1/admin/distribution/rules",
            get(admin::get_rules).post(admin::post_rule),
        )
        .route(
            "/v1/admin/distribution/toggle",
            get(admin::get_toggle).post(admin::post_toggle),
        )
        .route("/v1/admin/distribution/assign", post(admin::post_assign))
        .route("/v1/admin/distribution/auto", post(admin::post_auto))
        .route("/v1/admin/distribution/batch", post(admin::post_batch))
        .route("/v1/admin/distribution/requeue", post(admin::post_requeue))
        .route("/v1/admin/distribution/stats", get(admin::get_stats))
        .route("/v1/admin/presence/stats", get(admin::get_presence_stats))
        .route("/v1/admin/ingest/sweep", post(admin::post_ingest_sweep))
        .route("/v1/admin/ingest/stats", get(admin::get_ingest_stats))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    // SSE routes authenticate via query parameter (EventSource cannot set
    // headers), so they sit outside the middleware.
    let sse_routes = Router::new()
        .route("/v1/leads/events", get(sse::agent_events))
        .route("/v1/admin/events", get(sse::admin_events))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(agent_routes)
        .merge(admin_routes)
        .merge(sse_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server and serve until the task is aborted.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), LeadflowError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeadflowError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| LeadflowError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
