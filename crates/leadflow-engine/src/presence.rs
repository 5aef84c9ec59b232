// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent presence tracking.
//!
//! Availability requires BOTH the explicit online flag and a heartbeat
//! within the staleness window; the flag alone is not sufficient, which
//! keeps agents that disconnected ungracefully out of the candidate pool.

use std::sync::Arc;

use chrono::{Duration, Utc};
use leadflow_core::{AdminEvent, Agent, AgentId, AgentRole, LeadStore, LeadflowError};
use leadflow_config::model::PresenceConfig;
use tracing::{info, warn};

use crate::notify::NotificationHub;

/// Tracks which agents are currently able to receive leads.
pub struct PresenceTracker {
    store: Arc<dyn LeadStore>,
    hub: Arc<NotificationHub>,
    staleness: Duration,
    roles: Vec<AgentRole>,
}

impl PresenceTracker {
    pub fn new(
        store: Arc<dyn LeadStore>,
        hub: Arc<NotificationHub>,
        config: &PresenceConfig,
    ) -> Self {
        Self {
            store,
            hub,
            staleness: Duration::seconds(config.staleness_secs as i64),
            roles: config.roles.clone(),
        }
    }

    /// Set the explicit online flag and refresh the heartbeat.
    ///
    /// Emits a presence-changed event on the admin observer channel and
    /// opens/closes a presence session row; both are best-effort and never
    /// fail the toggle itself.
    pub async fn set_online(&self, agent_id: AgentId, online: bool) -> Result<Agent, LeadflowError> {
        let now = Utc::now();
        let agent = self
            .store
            .set_agent_presence(agent_id, online, now)
            .await?
            .ok_or_else(|| LeadflowError::agent_not_found(agent_id))?;

        let session_result = if online {
            self.store.open_presence_session(agent_id, now).await
        } else {
            self.store.close_presence_session(agent_id, now).await
        };
        if let Err(e) = session_result {
            warn!(error = %e, %agent_id, "failed to record presence session");
        }

        let delivered = self.hub.publish_admin(AdminEvent::PresenceChanged {
            agent_id,
            handle: agent.handle.clone(),
            online,
            at: now,
        });
        info!(
            handle = agent.handle.as_str(),
            online, delivered, "agent presence changed"
        );

        Ok(agent)
    }

    /// Refresh the heartbeat only; does not change the explicit flag.
    /// Idempotent and safe to call frequently.
    pub async fn heartbeat(&self, agent_id: AgentId) -> Result<(), LeadflowError> {
        if !self.store.touch_agent(agent_id, Utc::now()).await? {
            return Err(LeadflowError::agent_not_found(agent_id));
        }
        Ok(())
    }

    /// Whether the agent is online AND its heartbeat is inside the staleness
    /// window. Unknown agents read as unavailable.
    pub async fn is_available(&self, agent_id: AgentId) -> Result<bool, LeadflowError> {
        let Some(agent) = self.store.get_agent(agent_id).await? else {
            return Ok(false);
        };
        Ok(agent.online && Utc::now() - agent.last_seen <= self.staleness)
    }

    /// All currently available agents, most-recently-active first (agent id
    /// ascending as tie-break). `roles` defaults to the configured
    /// agent-capable set.
    pub async fn list_available(
        &self,
        roles: Option<&[AgentRole]>,
    ) -> Result<Vec<Agent>, LeadflowError> {
        let since = Utc::now() - self.staleness;
        let roles = roles.unwrap_or(&self.roles);
        let agents = self.store.list_agents_seen_since(since, roles).await?;
        leadflow_prometheus::set_agents_online(agents.len() as f64);
        Ok(agents)
    }
}
