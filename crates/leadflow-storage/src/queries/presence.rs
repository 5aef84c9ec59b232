// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence session log: one row per online stretch, closed on toggle-off.
//!
//! Sessions that started before the aggregation window are ignored; the
//! admin presence view is a same-day summary, not a ledger.

use chrono::{DateTime, Utc};
use leadflow_core::{AgentId, LeadflowError};
use rusqlite::params;

use crate::database::{decode_ts, decode_uuid, encode_ts, map_tr_err, Database};

/// Open a presence session row for an agent going online.
pub async fn open_session(
    db: &Database,
    agent_id: AgentId,
    at: DateTime<Utc>,
) -> Result<(), LeadflowError> {
    let agent_id = agent_id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO presence_sessions (agent_id, started_at) VALUES (?1, ?2)",
                params![agent_id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Close the latest open presence session for an agent going offline.
/// No-op when none is open.
pub async fn close_session(
    db: &Database,
    agent_id: AgentId,
    at: DateTime<Utc>,
) -> Result<(), LeadflowError> {
    let agent_id = agent_id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE presence_sessions SET ended_at = ?1
                 WHERE id = (
                     SELECT id FROM presence_sessions
                     WHERE agent_id = ?2 AND ended_at IS NULL
                     ORDER BY started_at DESC LIMIT 1
                 )",
                params![at, agent_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Total online seconds per agent for sessions started at or after `since`.
/// Open sessions count up to `now`.
pub async fn seconds_since(
    db: &Database,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<(AgentId, i64)>, LeadflowError> {
    let since_s = encode_ts(since);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT agent_id, started_at, ended_at FROM presence_sessions
                 WHERE started_at >= ?1
                 ORDER BY agent_id ASC, started_at ASC",
            )?;
            let rows = stmt.query_map(params![since_s], |row| {
                let agent_id = AgentId(decode_uuid(0, row.get(0)?)?);
                let started = decode_ts(1, row.get(1)?)?;
                let ended: Option<String> = row.get(2)?;
                let ended = ended.map(|raw| decode_ts(2, raw)).transpose()?;
                Ok((agent_id, started, ended))
            })?;

            let mut totals: Vec<(AgentId, i64)> = Vec::new();
            for row in rows {
                let (agent_id, started, ended) = row?;
                let end = ended.unwrap_or(now);
                let secs = (end - started).num_seconds().max(0);
                match totals.iter_mut().find(|(id, _)| *id == agent_id) {
                    Some((_, total)) => *total += secs,
                    None => totals.push((agent_id, secs)),
                }
            }
            Ok(totals)
        })
        .await
        .map_err(map_tr_err)
}
