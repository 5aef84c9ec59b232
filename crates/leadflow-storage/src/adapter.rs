// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the LeadStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use leadflow_config::model::StorageConfig;
use leadflow_core::{
    AdapterType, Agent, AgentId, AgentRole, AssignmentRecord, DistributionRule, HealthStatus,
    Lead, LeadCategory, LeadId, LeadStatus, LeadStore, LeadflowError, PluginAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed lead store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`LeadStore::initialize`].
pub struct SqliteLeadStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteLeadStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`LeadStore::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, LeadflowError> {
        self.db.get().ok_or_else(|| LeadflowError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteLeadStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn initialize(&self) -> Result<(), LeadflowError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| LeadflowError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), LeadflowError> {
        self.db()?.close().await
    }

    // --- Lead operations ---

    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadflowError> {
        queries::leads::insert_lead(self.db()?, lead).await
    }

    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::get_lead(self.db()?, id).await
    }

    async fn list_leads_by_status(
        &self,
        status: LeadStatus,
        created_before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Lead>, LeadflowError> {
        queries::leads::list_leads_by_status(self.db()?, status, created_before, limit).await
    }

    async fn list_leads_for_agent(
        &self,
        agent_id: AgentId,
        status: LeadStatus,
        category: Option<LeadCategory>,
    ) -> Result<Vec<Lead>, LeadflowError> {
        queries::leads::list_leads_for_agent(self.db()?, agent_id, status, category).await
    }

    async fn set_lead_status(
        &self,
        id: LeadId,
        status: LeadStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, LeadflowError> {
        queries::leads::set_lead_status(self.db()?, id, status, at).await
    }

    async fn claim_lead(
        &self,
        id: LeadId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::claim_lead(self.db()?, id, agent_id, at).await
    }

    async fn confirm_lead(
        &self,
        id: LeadId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::confirm_lead(self.db()?, id, agent_id, at).await
    }

    async fn discard_lead(
        &self,
        id: LeadId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::discard_lead(self.db()?, id, at).await
    }

    async fn release_lead(
        &self,
        id: LeadId,
        at: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::release_lead(self.db()?, id, at).await
    }

    // --- Agent operations ---

    async fn insert_agent(&self, agent: &Agent) -> Result<(), LeadflowError> {
        queries::agents::insert_agent(self.db()?, agent).await
    }

    async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>, LeadflowError> {
        queries::agents::get_agent(self.db()?, id).await
    }

    async fn get_agent_by_handle(&self, handle: &str) -> Result<Option<Agent>, LeadflowError> {
        queries::agents::get_agent_by_handle(self.db()?, handle).await
    }

    async fn set_agent_presence(
        &self,
        id: AgentId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Agent>, LeadflowError> {
        queries::agents::set_agent_presence(self.db()?, id, online, at).await
    }

    async fn touch_agent(&self, id: AgentId, at: DateTime<Utc>) -> Result<bool, LeadflowError> {
        queries::agents::touch_agent(self.db()?, id, at).await
    }

    async fn list_agents_seen_since(
        &self,
        since: DateTime<Utc>,
        roles: &[AgentRole],
    ) -> Result<Vec<Agent>, LeadflowError> {
        queries::agents::list_agents_seen_since(self.db()?, since, roles).await
    }

    // --- Distribution rules and global toggle ---

    async fn upsert_rule(&self, rule: &DistributionRule) -> Result<(), LeadflowError> {
        queries::distribution::upsert_rule(self.db()?, rule).await
    }

    async fn list_rules(&self) -> Result<Vec<DistributionRule>, LeadflowError> {
        queries::distribution::list_rules(self.db()?).await
    }

    async fn auto_distribution_enabled(&self) -> Result<bool, LeadflowError> {
        queries::distribution::auto_distribution_enabled(self.db()?).await
    }

    async fn set_auto_distribution(&self, enabled: bool) -> Result<(), LeadflowError> {
        queries::distribution::set_auto_distribution(self.db()?, enabled).await
    }

    // --- Assignment audit trail ---

    async fn append_assignment(&self, record: &AssignmentRecord) -> Result<i64, LeadflowError> {
        queries::distribution::append_assignment(self.db()?, record).await
    }

    async fn assignments_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AssignmentRecord>, LeadflowError> {
        queries::distribution::assignments_since(self.db()?, since).await
    }

    // --- Presence session log ---

    async fn open_presence_session(
        &self,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), LeadflowError> {
        queries::presence::open_session(self.db()?, agent_id, at).await
    }

    async fn close_presence_session(
        &self,
        agent_id: AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), LeadflowError> {
        queries::presence::close_session(self.db()?, agent_id, at).await
    }

    async fn presence_seconds_since(
        &self,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<(AgentId, i64)>, LeadflowError> {
        queries::presence::seconds_since(self.db()?, since, now).await
    }
}
