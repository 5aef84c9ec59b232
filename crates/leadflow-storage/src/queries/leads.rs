// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead CRUD and the guarded assignment transition.
//!
//! [`claim_lead`] is the system's single concurrency control: a conditional
//! UPDATE whose affected-row count decides the race. Zero rows means another
//! caller already owns the lead; that is data, not an error.

use chrono::{DateTime, Utc};
use leadflow_core::{AgentId, Lead, LeadCategory, LeadId, LeadStatus, LeadflowError};
use rusqlite::params;

use crate::database::{decode_enum, decode_ts, decode_uuid, encode_ts, map_tr_err, Database};

const LEAD_COLUMNS: &str = "id, name, contact, problem, address, recovery, payload, source_file, \
                            status, assigned_agent, created_at, assigned_at, updated_at";

pub(crate) fn lead_from_row(row: &rusqlite::Row<'_>) -> Result<Lead, rusqlite::Error> {
    let payload: Option<String> = row.get(6)?;
    let payload = match payload {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };
    let assigned_agent: Option<String> = row.get(9)?;
    let assigned_at: Option<String> = row.get(11)?;

    Ok(Lead {
        id: LeadId(decode_uuid(0, row.get(0)?)?),
        name: row.get(1)?,
        contact: row.get(2)?,
        problem: row.get(3)?,
        address: row.get(4)?,
        recovery: row.get(5)?,
        payload,
        source_file: row.get(7)?,
        status: decode_enum(8, row.get(8)?)?,
        assigned_agent: assigned_agent
            .map(|raw| decode_uuid(9, raw).map(AgentId))
            .transpose()?,
        created_at: decode_ts(10, row.get(10)?)?,
        assigned_at: assigned_at.map(|raw| decode_ts(11, raw)).transpose()?,
        updated_at: decode_ts(12, row.get(12)?)?,
    })
}

/// Insert a freshly ingested lead.
pub async fn insert_lead(db: &Database, lead: &Lead) -> Result<(), LeadflowError> {
    let lead = lead.clone();
    db.connection()
        .call(move |conn| {
            let payload = lead
                .payload
                .as_ref()
                .map(|p| serde_json::to_string(p))
                .transpose()
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO leads (id, name, contact, problem, address, recovery, payload, \
                 source_file, status, assigned_agent, created_at, assigned_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    lead.id.to_string(),
                    lead.name,
                    lead.contact,
                    lead.problem,
                    lead.address,
                    lead.recovery,
                    payload,
                    lead.source_file,
                    lead.status.to_string(),
                    lead.assigned_agent.map(|a| a.to_string()),
                    encode_ts(lead.created_at),
                    lead.assigned_at.map(encode_ts),
                    encode_ts(lead.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a lead by id.
pub async fn get_lead(db: &Database, id: LeadId) -> Result<Option<Lead>, LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], lead_from_row);
            match result {
                Ok(lead) => Ok(Some(lead)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List leads in a given status, oldest first (FIFO fairness). An optional
/// `created_before` cutoff excludes leads still inside a dwell window.
pub async fn list_leads_by_status(
    db: &Database,
    status: LeadStatus,
    created_before: Option<DateTime<Utc>>,
    limit: u32,
) -> Result<Vec<Lead>, LeadflowError> {
    let status = status.to_string();
    let cutoff = created_before.map(encode_ts);
    db.connection()
        .call(move |conn| {
            let mut leads = Vec::new();
            match &cutoff {
                Some(cutoff) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LEAD_COLUMNS} FROM leads
                         WHERE status = ?1 AND created_at <= ?2
                         ORDER BY created_at ASC LIMIT ?3"
                    ))?;
                    let rows = stmt.query_map(params![status, cutoff, limit], lead_from_row)?;
                    for row in rows {
                        leads.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LEAD_COLUMNS} FROM leads
                         WHERE status = ?1
                         ORDER BY created_at ASC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![status, limit], lead_from_row)?;
                    for row in rows {
                        leads.push(row?);
                    }
                }
            }
            Ok(leads)
        })
        .await
        .map_err(map_tr_err)
}

/// List an agent's leads in a status, newest first, optionally filtered by
/// category.
pub async fn list_leads_for_agent(
    db: &Database,
    agent_id: AgentId,
    status: LeadStatus,
    category: Option<LeadCategory>,
) -> Result<Vec<Lead>, LeadflowError> {
    let agent_id = agent_id.to_string();
    let status = status.to_string();
    let recovery = category.map(|c| c == LeadCategory::Recovery);
    db.connection()
        .call(move |conn| {
            let mut leads = Vec::new();
            match recovery {
                Some(recovery) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LEAD_COLUMNS} FROM leads
                         WHERE assigned_agent = ?1 AND status = ?2 AND recovery = ?3
                         ORDER BY created_at DESC LIMIT 200"
                    ))?;
                    let rows =
                        stmt.query_map(params![agent_id, status, recovery], lead_from_row)?;
                    for row in rows {
                        leads.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LEAD_COLUMNS} FROM leads
                         WHERE assigned_agent = ?1 AND status = ?2
                         ORDER BY created_at DESC LIMIT 200"
                    ))?;
                    let rows = stmt.query_map(params![agent_id, status], lead_from_row)?;
                    for row in rows {
                        leads.push(row?);
                    }
                }
            }
            Ok(leads)
        })
        .await
        .map_err(map_tr_err)
}

/// Unconditionally move a lead to a status. Returns whether a row was touched.
pub async fn set_lead_status(
    db: &Database,
    id: LeadId,
    status: LeadStatus,
    at: DateTime<Utc>,
) -> Result<bool, LeadflowError> {
    let id = id.to_string();
    let status = status.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE leads SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, at, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// The guarded transition. Sets the owner and moves to `assigned` only if the
/// lead currently has no owner and is not already assigned or confirmed.
///
/// Returns the updated lead, or `None` when the guard rejected the update
/// (lost race or terminal state). The UPDATE is atomic at the storage layer;
/// whichever concurrent caller's update is accepted is "the" assignment.
pub async fn claim_lead(
    db: &Database,
    id: LeadId,
    agent_id: AgentId,
    at: DateTime<Utc>,
) -> Result<Option<Lead>, LeadflowError> {
    let id = id.to_string();
    let agent_id = agent_id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE leads
                 SET assigned_agent = ?1, status = 'assigned', assigned_at = ?2, updated_at = ?2
                 WHERE id = ?3
                   AND assigned_agent IS NULL
                   AND status NOT IN ('assigned', 'confirmed')",
                params![agent_id, at, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"
            ))?;
            let lead = stmt.query_row(params![id], lead_from_row)?;
            Ok(Some(lead))
        })
        .await
        .map_err(map_tr_err)
}

/// Owner-guarded `assigned -> confirmed` transition.
pub async fn confirm_lead(
    db: &Database,
    id: LeadId,
    agent_id: AgentId,
    at: DateTime<Utc>,
) -> Result<Option<Lead>, LeadflowError> {
    let id = id.to_string();
    let agent_id = agent_id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE leads SET status = 'confirmed', updated_at = ?1
                 WHERE id = ?2 AND assigned_agent = ?3 AND status = 'assigned'",
                params![at, id, agent_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"
            ))?;
            let lead = stmt.query_row(params![id], lead_from_row)?;
            Ok(Some(lead))
        })
        .await
        .map_err(map_tr_err)
}

/// Move a lead to `discarded`, preserving its owner for audit.
pub async fn discard_lead(
    db: &Database,
    id: LeadId,
    at: DateTime<Utc>,
) -> Result<Option<Lead>, LeadflowError> {
    let id = id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE leads SET status = 'discarded', updated_at = ?1 WHERE id = ?2",
                params![at, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"
            ))?;
            let lead = stmt.query_row(params![id], lead_from_row)?;
            Ok(Some(lead))
        })
        .await
        .map_err(map_tr_err)
}

/// Return a lead to the assignable pool: `queued`, owner cleared. The only
/// owner-clearing transition.
pub async fn release_lead(
    db: &Database,
    id: LeadId,
    at: DateTime<Utc>,
) -> Result<Option<Lead>, LeadflowError> {
    let id = id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE leads
                 SET status = 'queued', assigned_agent = NULL, assigned_at = NULL, updated_at = ?1
                 WHERE id = ?2",
                params![at, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"
            ))?;
            let lead = stmt.query_row(params![id], lead_from_row)?;
            Ok(Some(lead))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    async fn seed_agent(db: &Database, handle: &str) -> AgentId {
        let now = Utc::now();
        let agent = leadflow_core::Agent {
            id: AgentId::new(),
            handle: handle.to_string(),
            display_name: None,
            role: leadflow_core::AgentRole::Sales,
            online: true,
            last_seen: now,
            created_at: now,
        };
        crate::queries::agents::insert_agent(db, &agent).await.unwrap();
        agent.id
    }

    fn make_lead(created_at: DateTime<Utc>) -> Lead {
        Lead {
            id: LeadId::new(),
            name: "Cliente Teste".to_string(),
            contact: "+55 11 98888-7777".to_string(),
            problem: "router keeps rebooting".to_string(),
            address: Some("Rua A, 100".to_string()),
            recovery: false,
            payload: Some(serde_json::json!({"transcript": "hello"})),
            source_file: Some("lead-001.json".to_string()),
            status: LeadStatus::Available,
            assigned_agent: None,
            created_at,
            assigned_at: None,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trips_all_fields() {
        let (db, _dir) = setup_db().await;
        let lead = make_lead(Utc::now());

        insert_lead(&db, &lead).await.unwrap();
        let got = get_lead(&db, lead.id).await.unwrap().unwrap();

        assert_eq!(got.id, lead.id);
        assert_eq!(got.name, lead.name);
        assert_eq!(got.contact, lead.contact);
        assert_eq!(got.problem, lead.problem);
        assert_eq!(got.address, lead.address);
        assert_eq!(got.payload, lead.payload);
        assert_eq!(got.source_file, lead.source_file);
        assert_eq!(got.status, LeadStatus::Available);
        assert!(got.assigned_agent.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_lead_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_lead(&db, LeadId::new()).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_sets_owner_exactly_once() {
        let (db, _dir) = setup_db().await;
        let lead = make_lead(Utc::now());
        insert_lead(&db, &lead).await.unwrap();

        let winner = seed_agent(&db, "winner").await;
        let loser = seed_agent(&db, "loser").await;

        let claimed = claim_lead(&db, lead.id, winner, Utc::now()).await.unwrap();
        assert!(claimed.is_some());
        let claimed = claimed.unwrap();
        assert_eq!(claimed.status, LeadStatus::Assigned);
        assert_eq!(claimed.assigned_agent, Some(winner));
        assert!(claimed.assigned_at.is_some());

        // The second claim loses the race and must not overwrite.
        let second = claim_lead(&db, lead.id, loser, Utc::now()).await.unwrap();
        assert!(second.is_none());

        let current = get_lead(&db, lead.id).await.unwrap().unwrap();
        assert_eq!(current.assigned_agent, Some(winner));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_claims_have_a_single_winner() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("race.db");
        let db = std::sync::Arc::new(
            Database::open(db_path.to_str().unwrap(), true).await.unwrap(),
        );

        let lead = make_lead(Utc::now());
        insert_lead(&db, &lead).await.unwrap();

        let mut agents = Vec::new();
        for i in 0..10 {
            agents.push(seed_agent(&db, &format!("racer-{i}")).await);
        }

        let mut handles = Vec::new();
        for agent_id in agents {
            let db = db.clone();
            let lead_id = lead.id;
            handles.push(tokio::spawn(async move {
                claim_lead(&db, lead_id, agent_id, Utc::now()).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            if result.is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one concurrent claim must win");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_by_status_is_fifo_and_respects_cutoff() {
        let (db, _dir) = setup_db().await;
        let base = Utc::now() - chrono::Duration::minutes(30);
        let old = make_lead(base);
        let newer = make_lead(base + chrono::Duration::minutes(10));
        let newest = make_lead(Utc::now());
        // Insert out of order to prove the query sorts.
        insert_lead(&db, &newer).await.unwrap();
        insert_lead(&db, &old).await.unwrap();
        insert_lead(&db, &newest).await.unwrap();

        let all = list_leads_by_status(&db, LeadStatus::Available, None, 100)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, old.id);
        assert_eq!(all[1].id, newer.id);
        assert_eq!(all[2].id, newest.id);

        // Cutoff excludes the lead created just now.
        let cutoff = Utc::now() - chrono::Duration::minutes(5);
        let aged = list_leads_by_status(&db, LeadStatus::Available, Some(cutoff), 100)
            .await
            .unwrap();
        assert_eq!(aged.len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn confirm_requires_the_owner() {
        let (db, _dir) = setup_db().await;
        let lead = make_lead(Utc::now());
        insert_lead(&db, &lead).await.unwrap();

        let owner = seed_agent(&db, "owner").await;
        claim_lead(&db, lead.id, owner, Utc::now())
            .await
            .unwrap()
            .unwrap();

        // A different agent cannot confirm.
        let other = confirm_lead(&db, lead.id, AgentId::new(), Utc::now())
            .await
            .unwrap();
        assert!(other.is_none());

        let confirmed = confirm_lead(&db, lead.id, owner, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(confirmed.status, LeadStatus::Confirmed);
        assert_eq!(confirmed.assigned_agent, Some(owner));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_clears_the_owner() {
        let (db, _dir) = setup_db().await;
        let lead = make_lead(Utc::now());
        insert_lead(&db, &lead).await.unwrap();
        let first = seed_agent(&db, "first").await;
        claim_lead(&db, lead.id, first, Utc::now())
            .await
            .unwrap()
            .unwrap();

        let released = release_lead(&db, lead.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(released.status, LeadStatus::Queued);
        assert!(released.assigned_agent.is_none());
        assert!(released.assigned_at.is_none());

        // A released lead is claimable again.
        let second = seed_agent(&db, "second").await;
        let reclaimed = claim_lead(&db, lead.id, second, Utc::now())
            .await
            .unwrap();
        assert!(reclaimed.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn discard_preserves_the_owner() {
        let (db, _dir) = setup_db().await;
        let lead = make_lead(Utc::now());
        insert_lead(&db, &lead).await.unwrap();
        let owner = seed_agent(&db, "owner").await;
        claim_lead(&db, lead.id, owner, Utc::now())
            .await
            .unwrap()
            .unwrap();

        let discarded = discard_lead(&db, lead.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(discarded.status, LeadStatus::Discarded);
        assert_eq!(discarded.assigned_agent, Some(owner));

        // Still owned, so a claim on it must fail the guard.
        let reclaim = claim_lead(&db, lead.id, AgentId::new(), Utc::now())
            .await
            .unwrap();
        assert!(reclaim.is_none());

        db.close().await.unwrap();
    }
}
