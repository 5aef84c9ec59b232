// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Distribution rules, the automatic-distribution toggle, and the
//! append-only assignment audit trail.

use chrono::{DateTime, Utc};
use leadflow_core::{
    AgentId, AssignmentRecord, DistributionRule, LeadId, LeadflowError,
};
use rusqlite::params;

use crate::database::{decode_enum, decode_ts, decode_uuid, encode_ts, map_tr_err, Database};

const TOGGLE_KEY: &str = "auto_distribution";

/// Upsert the distribution rule for an agent (latest write wins).
pub async fn upsert_rule(db: &Database, rule: &DistributionRule) -> Result<(), LeadflowError> {
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO distribution_rules (agent_id, weight, categories, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (agent_id) DO UPDATE SET
                     weight = excluded.weight,
                     categories = excluded.categories,
                     updated_at = excluded.updated_at",
                params![
                    rule.agent_id.to_string(),
                    rule.weight,
                    rule.categories.to_string(),
                    encode_ts(rule.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All configured distribution rules.
pub async fn list_rules(db: &Database) -> Result<Vec<DistributionRule>, LeadflowError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT agent_id, weight, categories, updated_at
                 FROM distribution_rules ORDER BY agent_id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(DistributionRule {
                    agent_id: AgentId(decode_uuid(0, row.get(0)?)?),
                    weight: row.get(1)?,
                    categories: decode_enum(2, row.get(2)?)?,
                    updated_at: decode_ts(3, row.get(3)?)?,
                })
            })?;
            let mut rules = Vec::new();
            for row in rows {
                rules.push(row?);
            }
            Ok(rules)
        })
        .await
        .map_err(map_tr_err)
}

/// Current value of the automatic-distribution toggle. A missing row reads
/// as disabled.
pub async fn auto_distribution_enabled(db: &Database) -> Result<bool, LeadflowError> {
    db.connection()
        .call(|conn| {
            let result = conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![TOGGLE_KEY],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(value) => Ok(value == "true"),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Set the automatic-distribution toggle.
pub async fn set_auto_distribution(db: &Database, enabled: bool) -> Result<(), LeadflowError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![TOGGLE_KEY, if enabled { "true" } else { "false" }],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Append an assignment record. Returns the generated row id.
pub async fn append_assignment(
    db: &Database,
    record: &AssignmentRecord,
) -> Result<i64, LeadflowError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO assignment_records (lead_id, agent_id, method, algorithm, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.lead_id.to_string(),
                    record.agent_id.to_string(),
                    record.method.to_string(),
                    record.algorithm.to_string(),
                    encode_ts(record.created_at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Assignment records created at or after `since`, oldest first.
pub async fn assignments_since(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<AssignmentRecord>, LeadflowError> {
    let since = encode_ts(since);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT lead_id, agent_id, method, algorithm, created_at
                 FROM assignment_records
                 WHERE created_at >= ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![since], |row| {
                Ok(AssignmentRecord {
                    lead_id: LeadId(decode_uuid(0, row.get(0)?)?),
                    agent_id: AgentId(decode_uuid(1, row.get(1)?)?),
                    method: decode_enum(2, row.get(2)?)?,
                    algorithm: decode_enum(3, row.get(3)?)?,
                    created_at: decode_ts(4, row.get(4)?)?,
                })
            })?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}
