// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent CRUD and presence mutations.

use chrono::{DateTime, Utc};
use leadflow_core::{Agent, AgentId, AgentRole, LeadflowError};
use rusqlite::params;

use crate::database::{decode_enum, decode_ts, decode_uuid, encode_ts, map_tr_err, Database};

const AGENT_COLUMNS: &str = "id, handle, display_name, role, online, last_seen, created_at";

pub(crate) fn agent_from_row(row: &rusqlite::Row<'_>) -> Result<Agent, rusqlite::Error> {
    Ok(Agent {
        id: AgentId(decode_uuid(0, row.get(0)?)?),
        handle: row.get(1)?,
        display_name: row.get(2)?,
        role: decode_enum(3, row.get(3)?)?,
        online: row.get(4)?,
        last_seen: decode_ts(5, row.get(5)?)?,
        created_at: decode_ts(6, row.get(6)?)?,
    })
}

/// Insert a provisioned agent account.
pub async fn insert_agent(db: &Database, agent: &Agent) -> Result<(), LeadflowError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (id, handle, display_name, role, online, last_seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    agent.id.to_string(),
                    agent.handle,
                    agent.display_name,
                    agent.role.to_string(),
                    agent.online,
                    encode_ts(agent.last_seen),
                    encode_ts(agent.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get an agent by id.
pub async fn get_agent(db: &Database, id: AgentId) -> Result<Option<Agent>, LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], agent_from_row);
            match result {
                Ok(agent) => Ok(Some(agent)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get an agent by handle.
pub async fn get_agent_by_handle(
    db: &Database,
    handle: &str,
) -> Result<Option<Agent>, LeadflowError> {
    let handle = handle.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AGENT_COLUMNS} FROM agents WHERE handle = ?1"
            ))?;
            let result = stmt.query_row(params![handle], agent_from_row);
            match result {
                Ok(agent) => Ok(Some(agent)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Set the explicit online flag and refresh `last_seen`. Returns the updated
/// agent, or `None` if unknown.
pub async fn set_agent_presence(
    db: &Database,
    id: AgentId,
    online: bool,
    at: DateTime<Utc>,
) -> Result<Option<Agent>, LeadflowError> {
    let id = id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE agents SET online = ?1, last_seen = ?2 WHERE id = ?3",
                params![online, at, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"
            ))?;
            let agent = stmt.query_row(params![id], agent_from_row)?;
            Ok(Some(agent))
        })
        .await
        .map_err(map_tr_err)
}

/// Refresh `last_seen` only (liveness heartbeat). Returns whether the agent
/// exists. Safe to call frequently.
pub async fn touch_agent(
    db: &Database,
    id: AgentId,
    at: DateTime<Utc>,
) -> Result<bool, LeadflowError> {
    let id = id.to_string();
    let at = encode_ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE agents SET last_seen = ?1 WHERE id = ?2",
                params![at, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// List agents with the online flag set whose `last_seen` is at or after
/// `since`, restricted to the given roles. Ordered most-recently-seen first,
/// agent id ascending as tie-break for determinism.
pub async fn list_agents_seen_since(
    db: &Database,
    since: DateTime<Utc>,
    roles: &[AgentRole],
) -> Result<Vec<Agent>, LeadflowError> {
    if roles.is_empty() {
        return Ok(Vec::new());
    }
    let since = encode_ts(since);
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    db.connection()
        .call(move |conn| {
            let placeholders = (0..roles.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT {AGENT_COLUMNS} FROM agents
                 WHERE online = 1 AND last_seen >= ?1 AND role IN ({placeholders})
                 ORDER BY last_seen DESC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;

            let mut params: Vec<&dyn rusqlite::ToSql> = vec![&since];
            for role in &roles {
                params.push(role);
            }
            let rows = stmt.query_map(params.as_slice(), agent_from_row)?;
            let mut agents = Vec::new();
            for row in rows {
                agents.push(row?);
            }
            Ok(agents)
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

    fn make_agent(handle: &str, role: AgentRole, online: bool, last_seen: DateTime<Utc>) -> Agent {
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

    #[tokio::test]
    async fn insert_and_get_by_id_and_handle() {
        let (db, _dir) = setup_db().await;
        let agent = make_agent("maria", AgentRole::Sales, true, Utc::now());

        insert_agent(&db, &agent).await.unwrap();

        let by_id = get_agent(&db, agent.id).await.unwrap().unwrap();
        assert_eq!(by_id.handle, "maria");
        assert_eq!(by_id.role, AgentRole::Sales);

        let by_handle = get_agent_by_handle(&db, "maria").await.unwrap().unwrap();
        assert_eq!(by_handle.id, agent.id);

        assert!(get_agent(&db, AgentId::new()).await.unwrap().is_none());
        assert!(get_agent_by_handle(&db, "nobody").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_presence_updates_flag_and_last_seen() {
        let (db, _dir) = setup_db().await;
        let stale = Utc::now() - chrono::Duration::hours(1);
        let agent = make_agent("joao", AgentRole::Sales, false, stale);
        insert_agent(&db, &agent).await.unwrap();

        let now = Utc::now();
        let updated = set_agent_presence(&db, agent.id, true, now)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.online);
        assert!(updated.last_seen > stale);

        // Unknown agent yields None.
        let missing = set_agent_presence(&db, AgentId::new(), true, now)
            .await
            .unwrap();
        assert!(missing.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn touch_refreshes_last_seen_without_flag_change() {
        let (db, _dir) = setup_db().await;
        let stale = Utc::now() - chrono::Duration::hours(1);
        let agent = make_agent("ana", AgentRole::Sales, false, stale);
        insert_agent(&db, &agent).await.unwrap();

        assert!(touch_agent(&db, agent.id, Utc::now()).await.unwrap());
        let got = get_agent(&db, agent.id).await.unwrap().unwrap();
        assert!(!got.online, "heartbeat must not flip the explicit flag");
        assert!(got.last_seen > stale);

        assert!(!touch_agent(&db, AgentId::new(), Utc::now()).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn seen_since_filters_flag_freshness_and_role() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let fresh = now - chrono::Duration::seconds(30);
        let stale = now - chrono::Duration::minutes(10);

        let online_fresh = make_agent("a-online", AgentRole::Sales, true, fresh);
        let online_stale = make_agent("b-stale", AgentRole::Sales, true, stale);
        let offline_fresh = make_agent("c-offline", AgentRole::Sales, false, fresh);
        let wrong_role = make_agent("d-admin", AgentRole::Admin, true, fresh);
        for agent in [&online_fresh, &online_stale, &offline_fresh, &wrong_role] {
            insert_agent(&db, agent).await.unwrap();
        }

        let since = now - chrono::Duration::seconds(120);
        let available = list_agents_seen_since(&db, since, &[AgentRole::Sales])
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, online_fresh.id);

        // Empty role filter matches nothing.
        let none = list_agents_seen_since(&db, since, &[]).await.unwrap();
        assert!(none.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn seen_since_orders_by_recency_then_id() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let older = make_agent("older", AgentRole::Sales, true, now - chrono::Duration::seconds(60));
        let newer = make_agent("newer", AgentRole::Sales, true, now - chrono::Duration::seconds(10));
        insert_agent(&db, &older).await.unwrap();
        insert_agent(&db, &newer).await.unwrap();

        let listed = list_agents_seen_since(
            &db,
            now - chrono::Duration::seconds(120),
            &[AgentRole::Sales],
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id, "most recently seen comes first");

        db.close().await.unwrap();
    }
}
