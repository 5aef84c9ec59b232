// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Card payload construction from a confirmed lead.

use leadflow_core::{Agent, Lead};

/// Board API limits.
const MAX_NAME_LEN: usize = 512;
const MAX_DESC_LEN: usize = 16_384;

/// A card ready to be pushed to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPayload {
    pub name: String,
    pub desc: String,
}

/// Build a card from a lead and, when known, the converting agent.
///
/// The card title is "name - contact"; the description is a bullet list of
/// the lead's typed fields. The opaque payload is not expanded onto the
/// card.
pub fn build_card(lead: &Lead, agent: Option<&Agent>) -> CardPayload {
    let mut lines = Vec::new();
    let mut push = |key: &str, value: &str| {
        if !value.is_empty() {
            lines.push(format!("- {key}: {value}"));
        }
    };

    push("Name", &lead.name);
    push("Contact", &lead.contact);
    if let Some(address) = &lead.address {
        push("Address", address);
    }
    push("Problem", &lead.problem);
    push("Category", &lead.category().to_string());
    if let Some(source_file) = &lead.source_file {
        push("Source file", source_file);
    }
    push("Lead id", &lead.id.to_string());
    if let Some(agent) = agent {
        push("Agent", agent.name());
    }

    let name = truncate(format!("{} - {}", lead.name, lead.contact).trim(), MAX_NAME_LEN);
    let desc = truncate(&lines.join("\n"), MAX_DESC_LEN);

    CardPayload { name, desc }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadflow_core::{AgentId, AgentRole, LeadId, LeadStatus};

    fn sample_lead(name: &str) -> Lead {
        let now = Utc::now();
        Lead {
            id: LeadId::new(),
            name: name.to_string(),
            contact: "+55 11 90000-0000".to_string(),
            problem: "no signal".to_string(),
            address: None,
            recovery: true,
            payload: Some(serde_json::json!({"secret": "not on card"})),
            source_file: None,
            status: LeadStatus::Confirmed,
            assigned_agent: None,
            created_at: now,
            assigned_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn card_title_is_name_and_contact() {
        let lead = sample_lead("Cliente");
        let card = build_card(&lead, None);
        assert_eq!(card.name, "Cliente - +55 11 90000-0000");
        assert!(card.desc.contains("- Problem: no signal"));
        assert!(card.desc.contains("- Category: recovery"));
        assert!(card.desc.contains(&format!("- Lead id: {}", lead.id)));
    }

    #[test]
    fn agent_line_uses_display_name() {
        let now = Utc::now();
        let agent = Agent {
            id: AgentId::new(),
            handle: "maria".to_string(),
            display_name: Some("Maria Silva".to_string()),
            role: AgentRole::Sales,
            online: true,
            last_seen: now,
            created_at: now,
        };
        let card = build_card(&sample_lead("Cliente"), Some(&agent));
        assert!(card.desc.contains("- Agent: Maria Silva"));
    }

    #[test]
    fn opaque_payload_is_not_expanded() {
        let card = build_card(&sample_lead("Cliente"), None);
        assert!(!card.desc.contains("secret"));
    }

    #[test]
    fn overlong_name_is_truncated_to_the_api_limit() {
        let lead = sample_lead(&"x".repeat(600));
        let card = build_card(&lead, None);
        assert_eq!(card.name.len(), MAX_NAME_LEN);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "aé".repeat(300); // multibyte
        let out = truncate(&s, 511);
        assert!(out.len() <= 511);
        assert!(s.starts_with(&out));
    }
}
