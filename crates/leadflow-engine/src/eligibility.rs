// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Eligibility resolution: joins the availability snapshot with the
//! distribution rules.
//!
//! An agent is eligible for a lead category when it is currently available,
//! has a distribution rule with weight > 0, and the rule's category filter
//! is `both` or matches exactly. Agents without a rule are excluded; there
//! is no default weight. For a fixed snapshot of presence and rules the
//! returned set and weights are stable.

use std::collections::HashMap;
use std::sync::Arc;

use leadflow_core::{DistributionRule, LeadCategory, LeadStore, LeadflowError};

use crate::presence::PresenceTracker;
use crate::selector::Candidate;

/// Resolves the weighted candidate set for a lead category.
pub struct EligibilityResolver {
    store: Arc<dyn LeadStore>,
    presence: Arc<PresenceTracker>,
}

impl EligibilityResolver {
    pub fn new(store: Arc<dyn LeadStore>, presence: Arc<PresenceTracker>) -> Self {
        Self { store, presence }
    }

    /// The eligible agents for `category`, with weights clamped to >= 0.
    /// Preserves the availability ordering (most-recently-active first).
    pub async fn eligible_for(
        &self,
        category: LeadCategory,
    ) -> Result<Vec<Candidate>, LeadflowError> {
        let available = self.presence.list_available(None).await?;
        if available.is_empty() {
            return Ok(Vec::new());
        }

        let rules = self.store.list_rules().await?;
        let by_agent: HashMap<_, &DistributionRule> =
            rules.iter().map(|r| (r.agent_id, r)).collect();

        let mut candidates = Vec::new();
        for agent in available {
            let Some(rule) = by_agent.get(&agent.id) else {
                continue;
            };
            if !rule.categories.matches(category) {
                continue;
            }
            let weight = rule.weight.max(0) as u32;
            if weight == 0 {
                continue;
            }
            candidates.push(Candidate { agent, weight });
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use leadflow_config::model::PresenceConfig;
    use leadflow_core::{AgentRole, CategoryFilter};
    use leadflow_test_utils::{make_agent, make_rule, MemoryLeadStore};

    use crate::notify::NotificationHub;

    fn resolver_over(store: Arc<MemoryLeadStore>) -> EligibilityResolver {
        let hub = Arc::new(NotificationHub::new());
        let presence = Arc::new(PresenceTracker::new(
            store.clone(),
            hub,
            &PresenceConfig::default(),
        ));
        EligibilityResolver::new(store, presence)
    }

    /// A(50, both), B(30, recovery), C(20, sale), all available. A sale
    /// lead's eligible set is {A, C}; B must never appear.
    #[tokio::test]
    async fn sale_lead_excludes_recovery_only_agents() {
        let store = Arc::new(MemoryLeadStore::new());
        let now = Utc::now();
        let a = make_agent("a", AgentRole::Sales, true, now);
        let b = make_agent("b", AgentRole::Sales, true, now);
        let c = make_agent("c", AgentRole::Sales, true, now);
        for agent in [&a, &b, &c] {
            store.insert_agent(agent).await.unwrap();
        }
        store.upsert_rule(&make_rule(a.id, 50, CategoryFilter::Both)).await.unwrap();
        store.upsert_rule(&make_rule(b.id, 30, CategoryFilter::Recovery)).await.unwrap();
        store.upsert_rule(&make_rule(c.id, 20, CategoryFilter::Sale)).await.unwrap();

        let resolver = resolver_over(store.clone());

        let sale = resolver.eligible_for(LeadCategory::Sale).await.unwrap();
        let ids: Vec<_> = sale.iter().map(|c| c.agent.id).collect();
        assert_eq!(sale.len(), 2);
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&c.id));
        assert!(!ids.contains(&b.id), "recovery-only agent leaked into sale set");
        let weight_of = |id| sale.iter().find(|c| c.agent.id == id).unwrap().weight;
        assert_eq!(weight_of(a.id), 50);
        assert_eq!(weight_of(c.id), 20);

        let recovery = resolver.eligible_for(LeadCategory::Recovery).await.unwrap();
        let ids: Vec<_> = recovery.iter().map(|c| c.agent.id).collect();
        assert_eq!(recovery.len(), 2);
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&b.id));
        assert!(!ids.contains(&c.id));
    }

    /// An unavailable agent never appears, even at weight 100.
    #[tokio::test]
    async fn unavailable_agent_is_excluded_despite_max_weight() {
        let store = Arc::new(MemoryLeadStore::new());
        let offline = make_agent("offline", AgentRole::Sales, false, Utc::now());
        let stale = make_agent(
            "stale",
            AgentRole::Sales,
            true,
            Utc::now() - Duration::minutes(30),
        );
        store.insert_agent(&offline).await.unwrap();
        store.insert_agent(&stale).await.unwrap();
        store
            .upsert_rule(&make_rule(offline.id, 100, CategoryFilter::Both))
            .await
            .unwrap();
        store
            .upsert_rule(&make_rule(stale.id, 100, CategoryFilter::Both))
            .await
            .unwrap();

        let resolver = resolver_over(store);
        let candidates = resolver.eligible_for(LeadCategory::Sale).await.unwrap();
        assert!(candidates.is_empty());
    }

    /// Available agents without a rule are excluded: no default weight.
    #[tokio::test]
    async fn agent_without_rule_is_excluded() {
        let store = Arc::new(MemoryLeadStore::new());
        let unruled = make_agent("unruled", AgentRole::Sales, true, Utc::now());
        store.insert_agent(&unruled).await.unwrap();

        let resolver = resolver_over(store);
        let candidates = resolver.eligible_for(LeadCategory::Sale).await.unwrap();
        assert!(candidates.is_empty());
    }

    /// Zero and negative stored weights are both consumed as "not eligible".
    #[tokio::test]
    async fn non_positive_weights_are_excluded() {
        let store = Arc::new(MemoryLeadStore::new());
        let now = Utc::now();
        let zero = make_agent("zero", AgentRole::Sales, true, now);
        let negative = make_agent("negative", AgentRole::Sales, true, now);
        store.insert_agent(&zero).await.unwrap();
        store.insert_agent(&negative).await.unwrap();
        store.upsert_rule(&make_rule(zero.id, 0, CategoryFilter::Both)).await.unwrap();
        store
            .upsert_rule(&make_rule(negative.id, -10, CategoryFilter::Both))
            .await
            .unwrap();

        let resolver = resolver_over(store);
        let candidates = resolver.eligible_for(LeadCategory::Recovery).await.unwrap();
        assert!(candidates.is_empty());
    }
}
