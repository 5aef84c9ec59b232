// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow distribute` command implementation.
//!
//! One-shot batch distribution against the configured database, without
//! starting the gateway. Useful for operators draining a backlog and for
//! cron-style setups that prefer an external scheduler.

use std::sync::Arc;

use leadflow_config::model::LeadflowConfig;
use leadflow_core::{BatchReport, LeadStatus, LeadStore, LeadflowError, PluginAdapter};
use leadflow_engine::{Distributor, NotificationHub, PresenceTracker};
use leadflow_storage::SqliteLeadStore;
use tracing::info;

/// Runs the `leadflow distribute` command. Returns the aggregate report.
pub async fn run_distribute(
    config: LeadflowConfig,
    status: LeadStatus,
    honor_delay: bool,
) -> Result<BatchReport, LeadflowError> {
    let store = Arc::new(SqliteLeadStore::new(config.storage.clone()));
    store.initialize().await?;
    let store: Arc<dyn LeadStore> = store;

    let hub = Arc::new(NotificationHub::new());
    let presence = Arc::new(PresenceTracker::new(
        store.clone(),
        hub.clone(),
        &config.presence,
    ));
    let distributor = Distributor::new(
        store.clone(),
        hub,
        presence,
        None,
        config.distribution.clone(),
    );

    let report = distributor.assign_batch(status, !honor_delay).await?;
    info!(
        status = %status,
        assigned = report.assigned,
        queued = report.queued,
        errors = report.errors,
        "one-shot distribution finished"
    );

    store.shutdown().await?;
    Ok(report)
}
