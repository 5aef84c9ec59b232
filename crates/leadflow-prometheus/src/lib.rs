// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Leadflow distribution engine.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text format via the `render()` method, which is
//! exposed through the gateway's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use leadflow_core::traits::adapter::PluginAdapter;
use leadflow_core::traits::observability::ObservabilityAdapter;
use leadflow_core::types::{AdapterType, HealthStatus, MetricEvent};
use leadflow_core::LeadflowError;

pub use recording::{
    record_assignment_conflict, record_ingest_rejected, record_lead_assigned,
    record_lead_ingested, register_metrics, set_agents_online, set_sse_subscribers,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Create a new PrometheusAdapter.
    ///
    /// Installs the Prometheus recorder globally. Only one recorder can be
    /// installed per process; returns an error if one is already installed.
    pub fn new() -> Result<Self, LeadflowError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            LeadflowError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl ObservabilityAdapter for PrometheusAdapter {
    async fn record(&self, event: MetricEvent) -> Result<(), LeadflowError> {
        match event {
            MetricEvent::Counter { name, value, labels } => {
                let label_pairs: Vec<metrics::Label> = labels
                    .into_iter()
                    .map(|(k, v)| metrics::Label::new(k, v))
                    .collect();
                metrics::counter!(name, label_pairs).increment(value);
            }
            MetricEvent::Gauge { name, value, labels } => {
                let label_pairs: Vec<metrics::Label> = labels
                    .into_iter()
                    .map(|(k, v)| metrics::Label::new(k, v))
                    .collect();
                metrics::gauge!(name, label_pairs).set(value);
            }
            MetricEvent::Histogram { name, value, labels } => {
                let label_pairs: Vec<metrics::Label> = labels
                    .into_iter()
                    .map(|(k, v)| metrics::Label::new(k, v))
                    .collect();
                metrics::histogram!(name, label_pairs).record(value);
            }
        }
        Ok(())
    }
}
