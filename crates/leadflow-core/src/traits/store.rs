// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for leads, agents, distribution rules, and audit records.
//!
//! The engine is storage-agnostic: correctness of "at most one assignment
//! per lead" rests entirely on [`LeadStore::claim_lead`] being a conditional
//! update that is atomic at the storage layer. Implementations must report
//! a lost race as `Ok(None)`, never as an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Agent, AgentId, AgentRole, AssignmentRecord, DistributionRule, Lead, LeadCategory, LeadId,
    LeadStatus,
};

/// Storage contract consumed by the distribution engine and the gateway.
#[async_trait]
pub trait LeadStore: PluginAdapter {
    /// Initializes the backend (migrations, connection setup).
    async fn initialize(&self) -> Result<(), LeadflowError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), LeadflowError>;

    // --- Lead operations ---

    /// Insert a freshly ingested lead.
    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadflowError>;

    /// Get a lead by id.
    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, LeadflowError>;

    /// List leads in a given status, oldest first (FIFO fairness).
    ///
    /// `created_before` filters out leads still inside a dwell window;
    /// `limit` bounds batch size.
    async fn list_leads_by_status(
        &self,
        status: LeadStatus,
        created_before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Lead>, LeadflowError>;

    /// List an agent's leads in a given status, newest first, optionally
    /// filtered by category.
    async fn list_leads_for_agent(
        &self,
        agent_id: AgentId,
        status: LeadStatus,
        category: Option<LeadCategory>,
    ) -> Result<Vec<Lead>, LeadflowError>;

    /// Unconditionally move a lead to a status (used to park leads in
    /// `Queued`). Returns whether a row was touched.
    async fn set_lead_status(
        &self,
        id: LeadId,
        status: LeadStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, LeadflowError>;

    /// The guarded transition: set `assigned_agent` and move to `Assigned`
    /// ONLY IF the lead currently has no owner and is not already assigned
    /// or later. Returns the updated lead, or `None` when the guard failed
    /// (another caller already owns it; not an error).
    async fn claim_lead(
        &self,
        id: LeadId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError>;

    /// Owner-guarded `Assigned -> Confirmed` transition. `None` when the
    /// lead is not assigned to this agent.
    async fn confirm_lead(
        &self,
        id: LeadId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError>;

    /// Move a lead to `Discarded`, preserving its owner for audit.
    async fn discard_lead(&self, id: LeadId, at: DateTime<Utc>)
        -> Result<Option<Lead>, LeadflowError>;

    /// Return a lead to the assignable pool: status `Queued`, owner cleared.
    /// The only owner-clearing transition.
    async fn release_lead(&self, id: LeadId, at: DateTime<Utc>)
        -> Result<Option<Lead>, LeadflowError>;

    // --- Agent operations ---

    /// Insert a provisioned agent account.
    async fn insert_agent(&self, agent: &Agent) -> Result<(), LeadflowError>;

    /// Get an agent by id.
    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>, LeadflowError>;

    /// Get an agent by handle.
    async fn get_agent_by_handle(&self, handle: &str) -> Result<Option<Agent>, LeadflowError>;

    /// Set the explicit online flag and refresh `last_seen`. Returns the
    /// updated agent, or `None` if unknown.
    async fn set_agent_presence(
        &self,
        id: AgentId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Agent>, LeadflowError>;

    /// Refresh `last_seen` only (liveness heartbeat). Returns whether the
    /// agent exists.
    async fn touch_agent(&self, id: AgentId, at: DateTime<Utc>) -> Result<bool, LeadflowError>;

    /// List agents with the online flag set whose `last_seen` is at or after
    /// `since`, restricted to the given roles, ordered most-recently-seen
    /// first with agent id ascending as tie-break.
    async fn list_agents_seen_since(
        &self,
        since: DateTime<Utc>,
        roles: &[AgentRole],
    ) -> Result<Vec<Agent>, LeadflowError>;

    // --- Distribution rules and global toggle ---

    /// Upsert the distribution rule for an agent (latest write wins).
    async fn upsert_rule(&self, rule: &DistributionRule) -> Result<(), LeadflowError>;

    /// All configured distribution rules.
    async fn list_rules(&self) -> Result<Vec<DistributionRule>, LeadflowError>;

    /// Current value of the automatic-distribution toggle. Read fresh on
    /// every automatic-path lead; seconds-stale reads are acceptable.
    async fn auto_distribution_enabled(&self) -> Result<bool, LeadflowError>;

    /// Set the automatic-distribution toggle.
    async fn set_auto_distribution(&self, enabled: bool) -> Result<(), LeadflowError>;

    // --- Assignment audit trail (append-only) ---

    /// Append an assignment record. Never mutated or deleted.
    async fn append_assignment(&self, record: &AssignmentRecord) -> Result<i64, LeadflowError>;

    /// Assignment records created at or after `since`, oldest first.
    async fn assignments_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AssignmentRecord>, LeadflowError>;

    // --- Presence session log ---

    /// Open a presence session row for an agent going online.
    async fn open_presence_session(
        &self,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), LeadflowError>;

    /// Close the latest open presence session for an agent going offline.
    /// No-op when none is open.
    async fn close_presence_session(
        &self,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), LeadflowError>;

    /// Total online seconds per agent for sessions started at or after
    /// `since`; open sessions count up to `now`.
    async fn presence_seconds_since(
        &self,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<(AgentId, i64)>, LeadflowError>;
}
