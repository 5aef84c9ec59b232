// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture builders shared by engine, gateway, and binary tests.

use chrono::{DateTime, Utc};
use leadflow_core::{
    Agent, AgentId, AgentRole, CategoryFilter, DistributionRule, Lead, LeadId, LeadStatus,
};

/// A fresh `Available` lead created at `created_at` (sale category).
pub fn make_lead(created_at: DateTime<Utc>) -> Lead {
    Lead {
        id: LeadId::new(),
        name: "Cliente Teste".to_string(),
        contact: "+55 11 97777-6666".to_string(),
        problem: "intermittent outage".to_string(),
        address: None,
        recovery: false,
        payload: None,
        source_file: None,
        status: LeadStatus::Available,
        assigned_agent: None,
        created_at,
        assigned_at: None,
        updated_at: created_at,
    }
}

/// A recovery-category variant of [`make_lead`].
pub fn make_recovery_lead(created_at: DateTime<Utc>) -> Lead {
    Lead {
        recovery: true,
        ..make_lead(created_at)
    }
}

/// An agent with the given handle, role, flag, and heartbeat.
pub fn make_agent(handle: &str, role: AgentRole, online: bool, last_seen: DateTime<Utc>) -> Agent {
    Agent {
        id: AgentId::new(),
        handle: handle.to_string(),
        display_name: None,
        role,
        online,
        last_seen,
        created_at: last_seen,
    }
}

/// A distribution rule for an agent.
pub fn make_rule(agent_id: AgentId, weight: i32, categories: CategoryFilter) -> DistributionRule {
    DistributionRule {
        agent_id,
        weight,
        categories,
        updated_at: Utc::now(),
    }
}
