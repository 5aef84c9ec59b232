// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Same-day distribution and presence summaries for the admin surface.
//!
//! Aggregated from the append-only audit trail and the presence session
//! log; never used for control flow.

use chrono::{DateTime, Utc};
use leadflow_core::{
    AgentAssignmentCount, AgentId, AssignmentMethod, DistributionStats, LeadStore, LeadflowError,
};

use crate::distributor::start_of_day;

/// Today's assignment counts: total, per method, and per agent.
pub async fn distribution_today(
    store: &dyn LeadStore,
    now: DateTime<Utc>,
) -> Result<DistributionStats, LeadflowError> {
    let records = store.assignments_since(start_of_day(now)).await?;

    let mut stats = DistributionStats {
        total: records.len() as u32,
        ..DistributionStats::default()
    };
    for record in &records {
        match record.method {
            AssignmentMethod::Automatic => stats.automatic += 1,
            AssignmentMethod::Manual => stats.manual += 1,
        }
        match stats
            .by_agent
            .iter_mut()
            .find(|c| c.agent_id == record.agent_id)
        {
            Some(count) => count.count += 1,
            None => stats.by_agent.push(AgentAssignmentCount {
                agent_id: record.agent_id,
                count: 1,
            }),
        }
    }
    stats.by_agent.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(stats)
}

/// Today's online seconds per agent, from the presence session log.
pub async fn presence_today(
    store: &dyn LeadStore,
    now: DateTime<Utc>,
) -> Result<Vec<(AgentId, i64)>, LeadflowError> {
    store.presence_seconds_since(start_of_day(now), now).await
}
