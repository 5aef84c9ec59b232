// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort card-board mirror trait.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Agent, Lead};

/// Adapter for mirroring confirmed leads to an external kanban board.
///
/// Strictly fire-and-forget: a mirror failure must never roll back or block
/// the confirm transition. Callers log failures and move on.
#[async_trait]
pub trait BoardAdapter: PluginAdapter {
    /// Push a card for a lead that just reached `Confirmed`.
    async fn mirror_confirmed(
        &self,
        lead: &Lead,
        agent: Option<&Agent>,
    ) -> Result<(), LeadflowError>;
}
