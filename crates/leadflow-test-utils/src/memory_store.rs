// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory LeadStore for engine and gateway tests.
//!
//! Mirrors the SQLite adapter's semantics, including the guarded claim: the
//! whole store sits behind one mutex, so the conditional update is atomic
//! exactly like a single-statement UPDATE.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use leadflow_core::{
    AdapterType, Agent, AgentId, AgentRole, AssignmentRecord, DistributionRule, HealthStatus,
    Lead, LeadCategory, LeadId, LeadStatus, LeadStore, LeadflowError, PluginAdapter,
};

#[derive(Default)]
struct Inner {
    leads: HashMap<LeadId, Lead>,
    agents: HashMap<AgentId, Agent>,
    rules: HashMap<AgentId, DistributionRule>,
    auto_enabled: bool,
    assignments: Vec<AssignmentRecord>,
    sessions: Vec<(AgentId, DateTime<Utc>, Option<DateTime<Utc>>)>,
}

/// In-memory implementation of [`LeadStore`].
#[derive(Default)]
pub struct MemoryLeadStore {
    inner: Mutex<Inner>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, LeadflowError> {
        self.inner
            .lock()
            .map_err(|_| LeadflowError::Internal("memory store mutex poisoned".to_string()))
    }

    /// Number of assignment records appended so far.
    pub fn assignment_count(&self) -> usize {
        self.inner.lock().map(|i| i.assignments.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PluginAdapter for MemoryLeadStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn initialize(&self) -> Result<(), LeadflowError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), LeadflowError> {
        Ok(())
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadflowError> {
        self.lock()?.leads.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, LeadflowError> {
        Ok(self.lock()?.leads.get(&id).cloned())
    }

    async fn list_leads_by_status(
        &self,
        status: LeadStatus,
        created_before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Lead>, LeadflowError> {
        let inner = self.lock()?;
        let mut leads: Vec<Lead> = inner
            .leads
            .values()
            .filter(|l| l.status == status)
            .filter(|l| created_before.is_none_or(|cutoff| l.created_at <= cutoff))
            .cloned()
            .collect();
        leads.sort_by_key(|l| l.created_at);
        leads.truncate(limit as usize);
        Ok(leads)
    }

    async fn list_leads_for_agent(
        &self,
        agent_id: AgentId,
        status: LeadStatus,
        category: Option<LeadCategory>,
    ) -> Result<Vec<Lead>, LeadflowError> {
        let inner = self.lock()?;
        let mut leads: Vec<Lead> = inner
            .leads
            .values()
            .filter(|l| l.assigned_agent == Some(agent_id) && l.status == status)
            .filter(|l| category.is_none_or(|c| l.category() == c))
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn set_lead_status(
        &self,
        id: LeadId,
        status: LeadStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, LeadflowError> {
        let mut inner = self.lock()?;
        match inner.leads.get_mut(&id) {
            Some(lead) => {
                lead.status = status;
                lead.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_lead(
        &self,
        id: LeadId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        let mut inner = self.lock()?;
        let Some(lead) = inner.leads.get_mut(&id) else {
            return Ok(None);
        };
        // Same guard as the SQL conditional UPDATE.
        if lead.assigned_agent.is_some()
            || matches!(lead.status, LeadStatus::Assigned | LeadStatus::Confirmed)
        {
            return Ok(None);
        }
        lead.assigned_agent = Some(agent_id);
        lead.status = LeadStatus::Assigned;
        lead.assigned_at = Some(at);
        lead.updated_at = at;
        Ok(Some(lead.clone()))
    }

    async fn confirm_lead(
        &self,
        id: LeadId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        let mut inner = self.lock()?;
        let Some(lead) = inner.leads.get_mut(&id) else {
            return Ok(None);
        };
        if lead.status != LeadStatus::Assigned || lead.assigned_agent != Some(agent_id) {
            return Ok(None);
        }
        lead.status = LeadStatus::Confirmed;
        lead.updated_at = at;
        Ok(Some(lead.clone()))
    }

    async fn discard_lead(
        &self,
        id: LeadId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        let mut inner = self.lock()?;
        let Some(lead) = inner.leads.get_mut(&id) else {
            return Ok(None);
        };
        lead.status = LeadStatus::Discarded;
        lead.updated_at = at;
        Ok(Some(lead.clone()))
    }

    async fn release_lead(
        &self,
        id: LeadId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        let mut inner = self.lock()?;
        let Some(lead) = inner.leads.get_mut(&id) else {
            return Ok(None);
        };
        lead.status = LeadStatus::Queued;
        lead.assigned_agent = None;
        lead.assigned_at = None;
        lead.updated_at = at;
        Ok(Some(lead.clone()))
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<(), LeadflowError> {
        self.lock()?.agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>, LeadflowError> {
        Ok(self.lock()?.agents.get(&id).cloned())
    }

    async fn get_agent_by_handle(&self, handle: &str) -> Result<Option<Agent>, LeadflowError> {
        Ok(self
            .lock()?
            .agents
            .values()
            .find(|a| a.handle == handle)
            .cloned())
    }

    async fn set_agent_presence(
        &self,
        id: AgentId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Agent>, LeadflowError> {
        let mut inner = self.lock()?;
        match inner.agents.get_mut(&id) {
            Some(agent) => {
                agent.online = online;
                agent.last_seen = at;
                Ok(Some(agent.clone()))
            }
            None => Ok(None),
        }
    }

    async fn touch_agent(&self, id: AgentId, at: DateTime<Utc>) -> Result<bool, LeadflowError> {
        let mut inner = self.lock()?;
        match inner.agents.get_mut(&id) {
            Some(agent) => {
                agent.last_seen = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_agents_seen_since(
        &self,
        since: DateTime<Utc>,
        roles: &[AgentRole],
    ) -> Result<Vec<Agent>, LeadflowError> {
        let inner = self.lock()?;
        let mut agents: Vec<Agent> = inner
            .agents
            .values()
            .filter(|a| a.online && a.last_seen >= since && roles.contains(&a.role))
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.id.cmp(&b.id)));
        Ok(agents)
    }

    async fn upsert_rule(&self, rule: &DistributionRule) -> Result<(), LeadflowError> {
        self.lock()?.rules.insert(rule.agent_id, rule.clone());
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<DistributionRule>, LeadflowError> {
        let inner = self.lock()?;
        let mut rules: Vec<DistributionRule> = inner.rules.values().cloned().collect();
        rules.sort_by_key(|r| r.agent_id);
        Ok(rules)
    }

    async fn auto_distribution_enabled(&self) -> Result<bool, LeadflowError> {
        Ok(self.lock()?.auto_enabled)
    }

    async fn set_auto_distribution(&self, enabled: bool) -> Result<(), LeadflowError> {
        self.lock()?.auto_enabled = enabled;
        Ok(())
    }

    async fn append_assignment(&self, record: &AssignmentRecord) -> Result<i64, LeadflowError> {
        let mut inner = self.lock()?;
        inner.assignments.push(record.clone());
        Ok(inner.assignments.len() as i64)
    }

    async fn assignments_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AssignmentRecord>, LeadflowError> {
        let inner = self.lock()?;
        let mut records: Vec<AssignmentRecord> = inner
            .assignments
            .iter()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn open_presence_session(
        &self,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), LeadflowError> {
        self.lock()?.sessions.push((agent_id, at, None));
        Ok(())
    }

    async fn close_presence_session(
        &self,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), LeadflowError> {
        let mut inner = self.lock()?;
        if let Some(session) = inner
            .sessions
            .iter_mut()
            .rev()
            .find(|(id, _, ended)| *id == agent_id && ended.is_none())
        {
            session.2 = Some(at);
        }
        Ok(())
    }

    async fn presence_seconds_since(
        &self,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<(AgentId, i64)>, LeadflowError> {
        let inner = self.lock()?;
        let mut totals: Vec<(AgentId, i64)> = Vec::new();
        for (agent_id, started, ended) in inner.sessions.iter().filter(|(_, s, _)| *s >= since) {
            let end = ended.unwrap_or(now);
            let secs = (end - *started).num_seconds().max(0);
            match totals.iter_mut().find(|(id, _)| id == agent_id) {
                Some((_, total)) => *total += secs,
                None => totals.push((*agent_id, secs)),
            }
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn guarded_claim_matches_sqlite_semantics() {
        let store = MemoryLeadStore::new();
        let lead = fixtures::make_lead(Utc::now());
        store.insert_lead(&lead).await.unwrap();

        let winner = AgentId::new();
        assert!(store
            .claim_lead(lead.id, winner, Utc::now())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .claim_lead(lead.id, AgentId::new(), Utc::now())
            .await
            .unwrap()
            .is_none());

        let current = store.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(current.assigned_agent, Some(winner));
    }

    #[tokio::test]
    async fn seen_since_orders_and_filters_like_sqlite() {
        let store = MemoryLeadStore::new();
        let now = Utc::now();
        let newer = fixtures::make_agent("newer", AgentRole::Sales, true, now);
        let older = fixtures::make_agent(
            "older",
            AgentRole::Sales,
            true,
            now - chrono::Duration::seconds(60),
        );
        let offline = fixtures::make_agent("offline", AgentRole::Sales, false, now);
        for agent in [&newer, &older, &offline] {
            store.insert_agent(agent).await.unwrap();
        }

        let listed = store
            .list_agents_seen_since(now - chrono::Duration::seconds(120), &[AgentRole::Sales])
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
    }
}
