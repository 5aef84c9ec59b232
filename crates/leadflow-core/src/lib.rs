// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadflow lead-distribution engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Leadflow workspace. Storage, ingest,
//! board, and observability backends implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LeadflowError;
pub use types::{
    AdapterType, AdminEvent, Agent, AgentAssignmentCount, AgentEvent, AgentId, AgentRole,
    AssignmentMethod, AssignmentOutcome, AssignmentRecord, BatchReport, CategoryFilter,
    DistributionRule, DistributionStats, HealthStatus, Lead, LeadCategory, LeadId, LeadStatus,
    MetricEvent, SelectionAlgorithm,
};

// Re-export all adapter traits at crate root.
pub use traits::{BoardAdapter, LeadStore, ObservabilityAdapter, PluginAdapter};
