// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The assignment engine: lead state machine plus the automatic, manual,
//! batch, requeue, confirm, and discard entry points.
//!
//! Concurrency model: many independent tasks may call into the engine for
//! the same lead (HTTP handlers, the scheduler tick, ingestion events) with
//! no shared in-process lock. "At most one assignment per lead" rests
//! entirely on the store's guarded conditional update; a rejected guard is
//! reported as [`AssignmentOutcome::AlreadyAssigned`] and treated as success
//! of the other caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use leadflow_config::model::DistributionConfig;
use leadflow_core::{
    AgentEvent, AgentId, AssignmentMethod, AssignmentOutcome, AssignmentRecord, BatchReport,
    BoardAdapter, Lead, LeadId, LeadStatus, LeadStore, LeadflowError, SelectionAlgorithm,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::eligibility::EligibilityResolver;
use crate::notify::NotificationHub;
use crate::presence::PresenceTracker;
use crate::selector::{pick, RoundRobinCursor, Selection};

/// Who is asking for a lead transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// A sales agent acting on its own leads.
    Agent(AgentId),
    /// An administrative caller; may act on any lead.
    Admin,
}

/// The lead assignment engine.
pub struct Distributor {
    store: Arc<dyn LeadStore>,
    hub: Arc<NotificationHub>,
    presence: Arc<PresenceTracker>,
    eligibility: EligibilityResolver,
    board: Option<Arc<dyn BoardAdapter>>,
    config: DistributionConfig,
    cursor: RoundRobinCursor,
    rng: Mutex<StdRng>,
}

impl Distributor {
    pub fn new(
        store: Arc<dyn LeadStore>,
        hub: Arc<NotificationHub>,
        presence: Arc<PresenceTracker>,
        board: Option<Arc<dyn BoardAdapter>>,
        config: DistributionConfig,
    ) -> Self {
        let eligibility = EligibilityResolver::new(store.clone(), presence.clone());
        Self {
            store,
            hub,
            presence,
            eligibility,
            board,
            config,
            cursor: RoundRobinCursor::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed the selector RNG. Test hook for deterministic selection.
    pub fn with_seeded_rng(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Automatic assignment of a single lead.
    ///
    /// Honors the dwell window and the store-backed global toggle, then runs
    /// eligibility, selection, and the guarded transition. All non-`Assigned`
    /// outcomes are expected, non-fatal results.
    pub async fn auto_assign(&self, lead_id: LeadId) -> Result<AssignmentOutcome, LeadflowError> {
        let now = Utc::now();
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(lead_id))?;

        if lead.assigned_agent.is_some()
            || matches!(lead.status, LeadStatus::Assigned | LeadStatus::Confirmed)
        {
            return Ok(AssignmentOutcome::AlreadyAssigned);
        }

        // Dwell window: defer young leads instead of sleeping on them. The
        // scheduler's next sweep picks them up once they age past the delay.
        if self.config.min_delay_secs > 0 {
            let min_delay = Duration::seconds(self.config.min_delay_secs as i64);
            if now - lead.created_at < min_delay {
                if lead.status == LeadStatus::Available {
                    self.store
                        .set_lead_status(lead.id, LeadStatus::Queued, now)
                        .await?;
                }
                debug!(%lead_id, "lead inside dwell window; parked in queue");
                return Ok(AssignmentOutcome::TooEarly);
            }
        }

        // Read the toggle fresh on every automatic-path lead. A disabled
        // toggle parks the lead for later manual or batch pickup.
        if !self.store.auto_distribution_enabled().await? {
            if lead.status == LeadStatus::Available {
                self.store
                    .set_lead_status(lead.id, LeadStatus::Queued, now)
                    .await?;
            }
            debug!(%lead_id, "automatic distribution disabled; lead queued for manual pickup");
            return Ok(AssignmentOutcome::DistributionDisabled);
        }

        self.assign_via_rules(&lead, now).await
    }

    /// Operator override: assign a lead to a specific agent, skipping
    /// eligibility and weighting. The guarded transition still applies.
    pub async fn manual_assign(
        &self,
        lead_id: LeadId,
        agent_id: AgentId,
    ) -> Result<AssignmentOutcome, LeadflowError> {
        let now = Utc::now();
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| LeadflowError::agent_not_found(agent_id))?;
        self.store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(lead_id))?;

        self.finish_assignment(
            lead_id,
            agent.id,
            AssignmentMethod::Manual,
            SelectionAlgorithm::Manual,
            now,
        )
        .await
    }

    /// Batch distribution over all leads in `status`, oldest first, up to the
    /// configured limit.
    ///
    /// Each lead goes through the eligibility + selection + guarded-transition
    /// pipeline independently; a failing lead never aborts the sweep. Leads
    /// with no eligible agent are parked in `Queued` so repeated calls
    /// converge. The store-backed toggle is not consulted: batch runs are
    /// explicit administrative actions.
    pub async fn assign_batch(
        &self,
        status: LeadStatus,
        ignore_delay: bool,
    ) -> Result<BatchReport, LeadflowError> {
        let now = Utc::now();
        let cutoff = if ignore_delay || self.config.min_delay_secs == 0 {
            None
        } else {
            Some(now - Duration::seconds(self.config.min_delay_secs as i64))
        };

        let leads = self
            .store
            .list_leads_by_status(status, cutoff, self.config.batch_limit)
            .await?;
        if leads.is_empty() {
            return Ok(BatchReport::default());
        }

        let mut report = BatchReport::default();
        for lead in leads {
            match self.assign_via_rules(&lead, now).await {
                Ok(AssignmentOutcome::Assigned(_)) => report.assigned += 1,
                Ok(AssignmentOutcome::NoEligibleAgent) => report.queued += 1,
                Ok(AssignmentOutcome::AlreadyAssigned) => {
                    debug!(lead_id = %lead.id, "batch lead already taken by a concurrent caller");
                }
                Ok(AssignmentOutcome::TooEarly | AssignmentOutcome::DistributionDisabled) => {
                    // Not produced by the batch pipeline; counted as queued
                    // for completeness.
                    report.queued += 1;
                }
                Err(e) => {
                    error!(error = %e, lead_id = %lead.id, "batch assignment failed for lead");
                    report.errors += 1;
                }
            }
        }

        info!(
            status = %status,
            assigned = report.assigned,
            queued = report.queued,
            errors = report.errors,
            "batch distribution finished"
        );
        Ok(report)
    }

    /// Return a lead to the assignable pool.
    ///
    /// Agents may requeue only their own `Assigned` leads; admins may
    /// requeue from any state. Clears the owner. Explicit and auditable.
    pub async fn requeue(&self, lead_id: LeadId, actor: Actor) -> Result<Lead, LeadflowError> {
        let now = Utc::now();
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(lead_id))?;

        if let Actor::Agent(agent_id) = actor {
            if lead.status != LeadStatus::Assigned || lead.assigned_agent != Some(agent_id) {
                return Err(LeadflowError::Forbidden(
                    "only the owning agent may requeue an assigned lead".to_string(),
                ));
            }
        }

        let released = self
            .store
            .release_lead(lead_id, now)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(lead_id))?;

        info!(%lead_id, ?actor, previous_owner = ?lead.assigned_agent, "lead requeued");
        if let Some(previous_owner) = lead.assigned_agent {
            self.hub
                .publish(previous_owner, AgentEvent::LeadRequeued { lead_id });
        }
        Ok(released)
    }

    /// Owner-only `Assigned -> Confirmed` transition, then a best-effort
    /// board mirror. Mirror failures are logged and never roll back the
    /// confirmation.
    pub async fn confirm(&self, lead_id: LeadId, agent_id: AgentId) -> Result<Lead, LeadflowError> {
        let now = Utc::now();
        self.store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(lead_id))?;
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| LeadflowError::agent_not_found(agent_id))?;

        let Some(confirmed) = self.store.confirm_lead(lead_id, agent_id, now).await? else {
            return Err(LeadflowError::Forbidden(
                "lead is not currently assigned to this agent".to_string(),
            ));
        };

        if let Some(board) = &self.board {
            if let Err(e) = board.mirror_confirmed(&confirmed, Some(&agent)).await {
                warn!(error = %e, %lead_id, "board mirror failed; confirmation stands");
            }
        }

        info!(%lead_id, agent = agent.handle.as_str(), "lead confirmed");
        Ok(confirmed)
    }

    /// Move a lead to the trash pool. Agents may discard only leads they own
    /// (or unowned leads); admins may discard anything. The owner is
    /// preserved so the audit trail stays meaningful; requeue recovers the
    /// lead later.
    pub async fn discard(&self, lead_id: LeadId, actor: Actor) -> Result<Lead, LeadflowError> {
        let now = Utc::now();
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(lead_id))?;

        if let Actor::Agent(agent_id) = actor {
            if let Some(owner) = lead.assigned_agent {
                if owner != agent_id {
                    return Err(LeadflowError::Forbidden(
                        "cannot discard a lead owned by another agent".to_string(),
                    ));
                }
            }
        }

        let discarded = self
            .store
            .discard_lead(lead_id, now)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(lead_id))?;
        warn!(%lead_id, ?actor, "lead discarded");
        Ok(discarded)
    }

    /// Eligibility + selection + guarded transition for one lead. Shared by
    /// the automatic and batch paths.
    async fn assign_via_rules(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome, LeadflowError> {
        let category = lead.category();
        let candidates = self.eligibility.eligible_for(category).await?;

        let selection = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| LeadflowError::Internal("selector rng mutex poisoned".to_string()))?;
            pick(&candidates, &self.cursor, &mut *rng)
        };

        let (chosen, algorithm) = match selection {
            Some(Selection::Weighted(id)) => (id, SelectionAlgorithm::Weighted),
            Some(Selection::RoundRobin(id)) => (id, SelectionAlgorithm::RoundRobin),
            None => match self.balanced_candidate(now).await? {
                Some(id) => (id, SelectionAlgorithm::Balanced),
                None => return self.park(lead, now).await,
            },
        };

        self.finish_assignment(lead.id, chosen, AssignmentMethod::Automatic, algorithm, now)
            .await
    }

    /// Fallback when no weighted rule resolves: the available agent with the
    /// fewest assignments today. Disabled unless configured.
    async fn balanced_candidate(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<AgentId>, LeadflowError> {
        if !self.config.balanced_fallback {
            return Ok(None);
        }
        let available = self.presence.list_available(None).await?;
        if available.is_empty() {
            return Ok(None);
        }

        let records = self.store.assignments_since(start_of_day(now)).await?;
        let mut counts: HashMap<AgentId, u32> = HashMap::new();
        for record in &records {
            *counts.entry(record.agent_id).or_default() += 1;
        }

        // Availability order breaks ties, so the most recently active of the
        // least-loaded agents wins.
        let chosen = available
            .iter()
            .min_by_key(|agent| counts.get(&agent.id).copied().unwrap_or(0))
            .map(|agent| agent.id);
        Ok(chosen)
    }

    /// Park an unassignable lead in `Queued` so later sweeps retry it; a
    /// lead is deferred, never dropped.
    async fn park(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome, LeadflowError> {
        if lead.status == LeadStatus::Available {
            self.store
                .set_lead_status(lead.id, LeadStatus::Queued, now)
                .await?;
        }
        warn!(lead_id = %lead.id, category = %lead.category(), "no eligible agent; lead queued");
        Ok(AssignmentOutcome::NoEligibleAgent)
    }

    /// The guarded transition plus its side effects: audit record, metrics,
    /// and the fire-and-forget notification.
    async fn finish_assignment(
        &self,
        lead_id: LeadId,
        agent_id: AgentId,
        method: AssignmentMethod,
        algorithm: SelectionAlgorithm,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome, LeadflowError> {
        let Some(lead) = self.store.claim_lead(lead_id, agent_id, now).await? else {
            leadflow_prometheus::record_assignment_conflict();
            debug!(%lead_id, "lost the assignment race; success of the other caller");
            return Ok(AssignmentOutcome::AlreadyAssigned);
        };

        let record = AssignmentRecord {
            lead_id,
            agent_id,
            method,
            algorithm,
            created_at: now,
        };
        if let Err(e) = self.store.append_assignment(&record).await {
            // The lead having an owner is the primary invariant; the audit
            // trail is secondary. Logged for later reconciliation.
            error!(error = %e, %lead_id, "assignment record insert failed; assignment stands");
        }

        leadflow_prometheus::record_lead_assigned(&algorithm.to_string());
        let delivered = self
            .hub
            .publish(agent_id, AgentEvent::LeadAssigned { lead_id, method });
        info!(
            %lead_id,
            %agent_id,
            method = %method,
            algorithm = %algorithm,
            delivered,
            "lead assigned"
        );
        Ok(AssignmentOutcome::Assigned(lead))
    }
}

/// Midnight UTC of the given instant's day.
pub(crate) fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
