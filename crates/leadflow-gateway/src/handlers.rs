// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Public and agent-facing HTTP handlers.
//!
//! Thin glue: each handler maps the request onto one engine or store call
//! and translates the result. Expected assignment outcomes are 200s with a
//! descriptive body, never error statuses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use leadflow_core::{
    AgentId, AssignmentOutcome, Lead, LeadCategory, LeadId, LeadStatus, LeadStore, LeadflowError,
    PluginAdapter,
};
use leadflow_engine::Actor;

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Translate an engine error into an HTTP response.
pub(crate) fn error_response(e: LeadflowError) -> Response {
    let status = match &e {
        LeadflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        LeadflowError::Forbidden(_) => StatusCode::FORBIDDEN,
        LeadflowError::Validation(_) | LeadflowError::Config(_) => StatusCode::BAD_REQUEST,
        LeadflowError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        LeadflowError::Storage { .. }
        | LeadflowError::Transport { .. }
        | LeadflowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Body shared by single-lead responses.
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub lead: Lead,
}

/// Response for assignment attempts: the outcome label plus the lead when
/// this caller won the guarded transition.
#[derive(Debug, Serialize)]
pub struct OutcomeResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead: Option<Lead>,
}

impl From<AssignmentOutcome> for OutcomeResponse {
    fn from(outcome: AssignmentOutcome) -> Self {
        match outcome {
            AssignmentOutcome::Assigned(lead) => Self {
                outcome: "assigned",
                lead: Some(lead),
            },
            AssignmentOutcome::AlreadyAssigned => Self {
                outcome: "already_assigned",
                lead: None,
            },
            AssignmentOutcome::TooEarly => Self {
                outcome: "too_early",
                lead: None,
            },
            AssignmentOutcome::DistributionDisabled => Self {
                outcome: "distribution_disabled",
                lead: None,
            },
            AssignmentOutcome::NoEligibleAgent => Self {
                outcome: "no_eligible_agent",
                lead: None,
            },
        }
    }
}

// --- Public routes ---

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
///
/// Unauthenticated liveness endpoint for systemd and the status command.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let status = match state.store.health_check().await {
        Ok(leadflow_core::HealthStatus::Healthy) => "ok".to_string(),
        Ok(leadflow_core::HealthStatus::Degraded(msg)) => format!("degraded: {msg}"),
        Ok(leadflow_core::HealthStatus::Unhealthy(msg)) => format!("unhealthy: {msg}"),
        Err(e) => format!("unhealthy: {e}"),
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
    .into_response()
}

/// GET /metrics
///
/// Prometheus text exposition; 404 when no recorder is installed.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (StatusCode::OK, render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics not enabled\n").into_response(),
    }
}

// --- Agent routes ---

/// Request body for POST /v1/presence.
#[derive(Debug, Deserialize)]
pub struct PresenceRequest {
    pub agent_id: AgentId,
    pub online: bool,
}

/// POST /v1/presence
///
/// Explicit online/offline toggle; refreshes the heartbeat as a side effect.
pub async fn post_presence(
    State(state): State<GatewayState>,
    Json(body): Json<PresenceRequest>,
) -> Response {
    match state.presence.set_online(body.agent_id, body.online).await {
        Ok(agent) => Json(agent).into_response(),
        Err(e) => error_response(e),
    }
}

/// Request body for POST /v1/presence/heartbeat.
#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub agent_id: AgentId,
}

/// POST /v1/presence/heartbeat
///
/// Liveness ping; does not change the explicit flag.
pub async fn post_heartbeat(
    State(state): State<GatewayState>,
    Json(body): Json<HeartbeatRequest>,
) -> Response {
    match state.presence.heartbeat(body.agent_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Query parameters for GET /v1/leads.
#[derive(Debug, Deserialize)]
pub struct MyLeadsQuery {
    pub agent_id: AgentId,
    #[serde(default = "default_status")]
    pub status: LeadStatus,
    #[serde(default)]
    pub category: Option<LeadCategory>,
}

fn default_status() -> LeadStatus {
    LeadStatus::Assigned
}

/// Response body for GET /v1/leads.
#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
}

/// GET /v1/leads?agent_id=...&status=...&category=...
///
/// The agent's own leads, newest first.
pub async fn get_my_leads(
    State(state): State<GatewayState>,
    Query(query): Query<MyLeadsQuery>,
) -> Response {
    match state
        .store
        .list_leads_for_agent(query.agent_id, query.status, query.category)
        .await
    {
        Ok(leads) => Json(LeadListResponse { leads }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Request body naming the acting agent.
#[derive(Debug, Deserialize)]
pub struct ActingAgent {
    pub agent_id: AgentId,
}

/// POST /v1/leads/{id}/confirm
pub async fn post_confirm(
    State(state): State<GatewayState>,
    Path(id): Path<LeadId>,
    Json(body): Json<ActingAgent>,
) -> Response {
    match state.distributor.confirm(id, body.agent_id).await {
        Ok(lead) => Json(LeadResponse { lead }).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/leads/{id}/discard
pub async fn post_discard(
    State(state): State<GatewayState>,
    Path(id): Path<LeadId>,
    Json(body): Json<ActingAgent>,
) -> Response {
    match state
        .distributor
        .discard(id, Actor::Agent(body.agent_id))
        .await
    {
        Ok(lead) => Json(LeadResponse { lead }).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/leads/{id}/requeue
///
/// Owner requeue: returns the agent's own assigned lead to the pool.
pub async fn post_requeue(
    State(state): State<GatewayState>,
    Path(id): Path<LeadId>,
    Json(body): Json<ActingAgent>,
) -> Response {
    match state
        .distributor
        .requeue(id, Actor::Agent(body.agent_id))
        .await
    {
        Ok(lead) => Json(LeadResponse { lead }).into_response(),
        Err(e) => error_response(e),
    }
}
