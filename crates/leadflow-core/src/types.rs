// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across the Leadflow workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Unique identifier for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub Uuid);

impl LeadId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for LeadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a sales agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for AgentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of a lead.
///
/// Transitions are driven solely by the assignment engine and explicit agent
/// actions. `Discarded` is a state, not a deletion; discarded leads stay
/// queryable for repechage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Freshly ingested, never touched by the engine.
    Available,
    /// Parked for a later assignment attempt (dwell window, no eligible agent,
    /// or explicit requeue).
    Queued,
    /// Owned by exactly one agent.
    Assigned,
    /// Converted by the owning agent.
    Confirmed,
    /// Trashed; recoverable via requeue.
    Discarded,
}

/// Category of a lead, derived from its recovery flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadCategory {
    Recovery,
    Sale,
}

/// Which lead categories a distribution rule applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    Recovery,
    Sale,
    Both,
}

impl CategoryFilter {
    /// Whether this filter admits the given category.
    pub fn matches(self, category: LeadCategory) -> bool {
        match self {
            CategoryFilter::Both => true,
            CategoryFilter::Recovery => category == LeadCategory::Recovery,
            CategoryFilter::Sale => category == LeadCategory::Sale,
        }
    }
}

/// Role of an agent account. Only agent-capable roles receive leads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Sales,
    SalesAdmin,
    Admin,
}

/// A sales prospect record requiring assignment to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub contact: String,
    pub problem: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Category flag: `true` marks a recovery lead, `false` a sale lead.
    pub recovery: bool,
    /// The full ingested record, stored and forwarded but never parsed by
    /// the engine. Only the validated field set above is typed.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Basename of the drop file this lead was ingested from, if any.
    #[serde(default)]
    pub source_file: Option<String>,
    pub status: LeadStatus,
    pub assigned_agent: Option<AgentId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// The category this lead belongs to for eligibility purposes.
    pub fn category(&self) -> LeadCategory {
        if self.recovery {
            LeadCategory::Recovery
        } else {
            LeadCategory::Sale
        }
    }
}

/// A sales representative capable of receiving leads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: AgentRole,
    /// Explicit online flag toggled by the agent. Not sufficient on its own;
    /// availability also requires a fresh heartbeat.
    pub online: bool,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Preferred human-readable name for logs and board cards.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.handle)
    }
}

/// Per-agent distribution rule: weight and category filter.
///
/// One row per agent, latest write wins. Weights need not sum to 100; the
/// selector normalizes. Negative stored weights are clamped to zero at
/// consumption time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRule {
    pub agent_id: AgentId,
    pub weight: i32,
    pub categories: CategoryFilter,
    pub updated_at: DateTime<Utc>,
}

/// How an assignment was initiated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    Automatic,
    Manual,
}

/// Which selection algorithm produced an assignment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SelectionAlgorithm {
    Weighted,
    Balanced,
    RoundRobin,
    Manual,
}

/// Append-only audit record of a single assignment. Used for statistics,
/// never for control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub lead_id: LeadId,
    pub agent_id: AgentId,
    pub method: AssignmentMethod,
    pub algorithm: SelectionAlgorithm,
    pub created_at: DateTime<Utc>,
}

/// Result of a single assignment attempt.
///
/// All variants except `Assigned` are expected, non-fatal outcomes; callers
/// may log them but must not treat them as errors.
#[derive(Debug, Clone)]
pub enum AssignmentOutcome {
    /// The guarded transition succeeded; this caller owns the assignment.
    Assigned(Lead),
    /// Another caller won the race. Exactly one assignment record exists;
    /// treated as success from the system's perspective.
    AlreadyAssigned,
    /// The lead is still inside its dwell window; parked in `Queued`.
    TooEarly,
    /// The automatic-distribution toggle is off; lead left untouched.
    DistributionDisabled,
    /// No agent is currently eligible; lead parked in `Queued` for retry.
    NoEligibleAgent,
}

/// Aggregate counts returned by batch distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub assigned: u32,
    pub queued: u32,
    pub errors: u32,
}

/// Today's distribution statistics, aggregated from the audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionStats {
    pub total: u32,
    pub automatic: u32,
    pub manual: u32,
    pub by_agent: Vec<AgentAssignmentCount>,
}

/// Per-agent slice of [`DistributionStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAssignmentCount {
    pub agent_id: AgentId,
    pub count: u32,
}

/// Event pushed to an agent's open real-time channels. At-most-effort:
/// not persisted, not retried; an agent with no open channel sees the lead
/// on its next list call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Hello { at: DateTime<Utc> },
    LeadAssigned { lead_id: LeadId, method: AssignmentMethod },
    LeadRequeued { lead_id: LeadId },
}

/// Event pushed to the admin observer channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminEvent {
    Hello {
        at: DateTime<Utc>,
    },
    PresenceChanged {
        agent_id: AgentId,
        handle: String,
        online: bool,
        at: DateTime<Utc>,
    },
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Ingest,
    Board,
    Observability,
}

/// A metric or telemetry event recorded through an observability adapter.
#[derive(Debug, Clone)]
pub enum MetricEvent {
    Counter {
        name: String,
        value: u64,
        labels: Vec<(String, String)>,
    },
    Gauge {
        name: String,
        value: f64,
        labels: Vec<(String, String)>,
    },
    Histogram {
        name: String,
        value: f64,
        labels: Vec<(String, String)>,
    },
}
