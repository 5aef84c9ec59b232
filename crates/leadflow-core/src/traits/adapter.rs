// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait implemented by all pluggable backends.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all Leadflow adapters (store, ingest, board, metrics).
///
/// Provides identity, lifecycle, and health check capabilities so the serve
/// loop and the `status` command can treat backends uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter (store, ingest, board, observability).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, LeadflowError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), LeadflowError>;
}
