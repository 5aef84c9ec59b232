// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative HTTP handlers: distribution rules, the global toggle,
//! batch triggers, requeue, and statistics.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use leadflow_core::{
    Agent, AgentId, AgentRole, CategoryFilter, DistributionRule, DistributionStats, LeadId,
    LeadStatus, LeadStore,
};
use leadflow_engine::{stats, Actor};

use crate::handlers::{error_response, LeadResponse, OutcomeResponse};
use crate::server::GatewayState;

/// Query parameters for GET /v1/admin/agents/online.
#[derive(Debug, Deserialize)]
pub struct OnlineAgentsQuery {
    /// Optional role restriction; defaults to the configured agent roles.
    #[serde(default)]
    pub role: Option<AgentRole>,
}

/// Response body for GET /v1/admin/agents/online.
#[derive(Debug, Serialize)]
pub struct OnlineAgentsResponse {
    pub agents: Vec<Agent>,
}

/// GET /v1/admin/agents/online
pub async fn get_agents_online(
    State(state): State<GatewayState>,
    Query(query): Query<OnlineAgentsQuery>,
) -> Response {
    let roles = query.role.map(|r| vec![r]);
    match state.presence.list_available(roles.as_deref()).await {
        Ok(agents) => Json(OnlineAgentsResponse { agents }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Response body for GET /v1/admin/distribution/rules.
#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub rules: Vec<DistributionRule>,
}

/// GET /v1/admin/distribution/rules
pub async fn get_rules(State(state): State<GatewayState>) -> Response {
    match state.store.list_rules().await {
        Ok(rules) => Json(RulesResponse { rules }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Request body for POST /v1/admin/distribution/rules.
#[derive(Debug, Deserialize)]
pub struct UpsertRuleRequest {
    pub agent_id: AgentId,
    pub weight: i32,
    pub categories: CategoryFilter,
}

/// POST /v1/admin/distribution/rules
///
/// Upsert an agent's rule; one row per agent, latest write wins.
pub async fn post_rule(
    State(state): State<GatewayState>,
    Json(body): Json<UpsertRuleRequest>,
) -> Response {
    // The rule references the agent; reject unknown ids up front.
    match state.store.get_agent(body.agent_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(leadflow_core::LeadflowError::agent_not_found(body.agent_id))
        }
        Err(e) => return error_response(e),
    }

    let rule = DistributionRule {
        agent_id: body.agent_id,
        weight: body.weight,
        categories: body.categories,
        updated_at: Utc::now(),
    };
    match state.store.upsert_rule(&rule).await {
        Ok(()) => {
            tracing::info!(
                agent_id = %rule.agent_id,
                weight = rule.weight,
                categories = %rule.categories,
                "distribution rule saved"
            );
            Json(rule).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Response body for toggle reads and writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub enabled: bool,
}

/// GET /v1/admin/distribution/toggle
pub async fn get_toggle(State(state): State<GatewayState>) -> Response {
    match state.store.auto_distribution_enabled().await {
        Ok(enabled) => Json(ToggleResponse { enabled }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Request body for POST /v1/admin/distribution/toggle.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

/// POST /v1/admin/distribution/toggle
pub async fn post_toggle(
    State(state): State<GatewayState>,
    Json(body): Json<ToggleRequest>,
) -> Response {
    match state.store.set_auto_distribution(body.enabled).await {
        Ok(()) => {
            tracing::info!(enabled = body.enabled, "automatic distribution toggled");
            Json(ToggleResponse {
                enabled: body.enabled,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Request body for POST /v1/admin/distribution/assign.
#[derive(Debug, Deserialize)]
pub struct ManualAssignRequest {
    pub lead_id: LeadId,
    pub agent_id: AgentId,
}

/// POST /v1/admin/distribution/assign
///
/// Operator override: assign a specific lead to a specific agent.
pub async fn post_assign(
    State(state): State<GatewayState>,
    Json(body): Json<ManualAssignRequest>,
) -> Response {
    match state
        .distributor
        .manual_assign(body.lead_id, body.agent_id)
        .await
    {
        Ok(outcome) => Json(OutcomeResponse::from(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Request body for POST /v1/admin/distribution/auto.
#[derive(Debug, Deserialize)]
pub struct AutoAssignRequest {
    pub lead_id: LeadId,
}

/// POST /v1/admin/distribution/auto
///
/// Run the full automatic pipeline for one lead.
pub async fn post_auto(
    State(state): State<GatewayState>,
    Json(body): Json<AutoAssignRequest>,
) -> Response {
    match state.distributor.auto_assign(body.lead_id).await {
        Ok(outcome) => Json(OutcomeResponse::from(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Request body for POST /v1/admin/distribution/batch.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Which pool to sweep; defaults to `available`.
    #[serde(default = "default_batch_status")]
    pub status: LeadStatus,
    /// Skip the dwell-window cutoff. Defaults to true: an explicit batch
    /// trigger wants everything out the door now.
    #[serde(default = "default_ignore_delay")]
    pub ignore_delay: bool,
}

fn default_batch_status() -> LeadStatus {
    LeadStatus::Available
}

fn default_ignore_delay() -> bool {
    true
}

/// POST /v1/admin/distribution/batch
///
/// Sweep a status pool through the distribution pipeline. Returns aggregate
/// counts so partial success is visible and actionable.
pub async fn post_batch(
    State(state): State<GatewayState>,
    Json(body): Json<BatchRequest>,
) -> Response {
    // Flush any waiting drop files first so the sweep sees them.
    if let Some(ingest) = &state.ingest {
        ingest.process_existing().await;
    }

    match state
        .distributor
        .assign_batch(body.status, body.ignore_delay)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

/// Request body for POST /v1/admin/distribution/requeue.
#[derive(Debug, Deserialize)]
pub struct RequeueRequest {
    pub lead_id: LeadId,
}

/// POST /v1/admin/distribution/requeue
///
/// Admin requeue: return any lead to the pool, clearing its owner.
pub async fn post_requeue(
    State(state): State<GatewayState>,
    Json(body): Json<RequeueRequest>,
) -> Response {
    match state.distributor.requeue(body.lead_id, Actor::Admin).await {
        Ok(lead) => Json(LeadResponse { lead }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Response body for GET /v1/admin/distribution/stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: DistributionStats,
}

/// GET /v1/admin/distribution/stats
pub async fn get_stats(State(state): State<GatewayState>) -> Response {
    match stats::distribution_today(state.store.as_ref(), Utc::now()).await {
        Ok(stats) => Json(StatsResponse { stats }).into_response(),
        Err(e) => error_response(e),
    }
}

/// One agent's slice of the presence summary.
#[derive(Debug, Serialize)]
pub struct PresenceStat {
    pub agent_id: AgentId,
    pub online_seconds_today: i64,
}

/// Response body for GET /v1/admin/presence/stats.
#[derive(Debug, Serialize)]
pub struct PresenceStatsResponse {
    pub stats: Vec<PresenceStat>,
}

/// GET /v1/admin/presence/stats
///
/// Online seconds per agent for sessions started today.
pub async fn get_presence_stats(State(state): State<GatewayState>) -> Response {
    match stats::presence_today(state.store.as_ref(), Utc::now()).await {
        Ok(totals) => Json(PresenceStatsResponse {
            stats: totals
                .into_iter()
                .map(|(agent_id, online_seconds_today)| PresenceStat {
                    agent_id,
                    online_seconds_today,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Response body for POST /v1/admin/ingest/sweep.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub ingested: usize,
}

/// POST /v1/admin/ingest/sweep
///
/// Process files already sitting in the drop directory.
pub async fn post_ingest_sweep(State(state): State<GatewayState>) -> Response {
    match &state.ingest {
        Some(ingest) => {
            let ingested = ingest.process_existing().await;
            Json(SweepResponse { ingested }).into_response()
        }
        None => (StatusCode::CONFLICT, "ingest is disabled\n").into_response(),
    }
}

/// GET /v1/admin/ingest/stats
pub async fn get_ingest_stats(State(state): State<GatewayState>) -> Response {
    match &state.ingest {
        Some(ingest) => Json(ingest.stats()).into_response(),
        None => (StatusCode::CONFLICT, "ingest is disabled\n").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_request_defaults() {
        let body: BatchRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(body.status, LeadStatus::Available);
        assert!(body.ignore_delay);

        let body: BatchRequest =
            serde_json::from_str(r#"{"status": "queued", "ignore_delay": false}"#).unwrap();
        assert_eq!(body.status, LeadStatus::Queued);
        assert!(!body.ignore_delay);
    }

    #[test]
    fn upsert_rule_request_deserializes() {
        let body: UpsertRuleRequest = serde_json::from_str(&format!(
            r#"{{"agent_id": "{}", "weight": 40, "categories": "both"}}"#,
            AgentId::new()
        ))
        .unwrap();
        assert_eq!(body.weight, 40);
        assert_eq!(body.categories, CategoryFilter::Both);
    }
}
