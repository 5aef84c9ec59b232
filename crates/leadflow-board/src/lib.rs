// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort kanban-board mirror.
//!
//! When a lead reaches `Confirmed`, a card is pushed to the configured
//! board list over a Trello-style REST API. Strictly fire-and-forget: a
//! mirror failure is logged by the caller and never rolls back or blocks
//! the confirm transition. Missing credentials skip the push with a warn.

pub mod card;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use leadflow_config::model::BoardConfig;
use leadflow_core::{
    AdapterType, Agent, BoardAdapter, HealthStatus, Lead, LeadflowError, PluginAdapter,
};

pub use card::{build_card, CardPayload};

/// HTTP client for the board REST API.
pub struct BoardClient {
    config: BoardConfig,
    http: reqwest::Client,
}

impl BoardClient {
    /// Create a new client. Credentials may be absent; pushes are then
    /// skipped at call time.
    pub fn new(config: BoardConfig) -> Result<Self, LeadflowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LeadflowError::Transport {
                message: format!("failed to build board HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { config, http })
    }

    /// Push a card to a board list.
    async fn create_card(&self, payload: &CardPayload, list_id: &str) -> Result<(), LeadflowError> {
        let (Some(key), Some(token)) = (&self.config.key, &self.config.token) else {
            warn!("board credentials missing; skipping card push");
            return Ok(());
        };

        let url = format!("{}/cards", self.config.api_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .query(&[("key", key.as_str()), ("token", token.as_str())])
            .form(&[
                ("idList", list_id),
                ("name", &payload.name),
                ("desc", &payload.desc),
                ("pos", "top"),
            ])
            .send()
            .await
            .map_err(|e| LeadflowError::Transport {
                message: format!("board card push failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(LeadflowError::Transport {
                message: format!("board card push returned {}", response.status()),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for BoardClient {
    fn name(&self) -> &str {
        "board"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Board
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        if self.config.is_configured() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(
                "board credentials not configured; pushes are skipped".to_string(),
            ))
        }
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl BoardAdapter for BoardClient {
    async fn mirror_confirmed(
        &self,
        lead: &Lead,
        agent: Option<&Agent>,
    ) -> Result<(), LeadflowError> {
        let Some(list_id) = self.config.confirmed_list.clone() else {
            warn!(lead_id = %lead.id, "no confirmed-list configured; skipping card push");
            return Ok(());
        };

        let payload = build_card(lead, agent);
        self.create_card(&payload, &list_id).await?;
        info!(lead_id = %lead.id, "confirmed lead mirrored to board");
        Ok(())
    }
}
