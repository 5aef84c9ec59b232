// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observability adapter trait for metrics backends.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::MetricEvent;

/// Adapter for recording metrics and telemetry events.
#[async_trait]
pub trait ObservabilityAdapter: PluginAdapter {
    /// Record a single metric event.
    async fn record(&self, event: MetricEvent) -> Result<(), LeadflowError>;
}
