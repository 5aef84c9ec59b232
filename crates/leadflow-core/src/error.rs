// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Leadflow distribution engine.
//!
//! Expected assignment outcomes (lost races, dwell-time deferrals, empty
//! candidate sets) are NOT errors; they are modeled by
//! [`AssignmentOutcome`](crate::types::AssignmentOutcome). This enum covers
//! genuine failures only.

use thiserror::Error;

/// The primary error type used across all Leadflow crates.
#[derive(Debug, Error)]
pub enum LeadflowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    ///
    /// Every mutating store operation is either conditional or append-only,
    /// so callers may retry the whole operation after a storage error.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced entity does not exist. Surfaced to the caller, not retried.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The acting party is not allowed to perform this transition
    /// (e.g. requeueing a lead owned by another agent).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A malformed ingested record. The record is skipped and logged; it must
    /// never abort the ingestion loop.
    #[error("validation error: {0}")]
    Validation(String),

    /// Outbound transport errors (notification channel, board mirror).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadflowError {
    /// Shorthand for a `NotFound` over a lead id.
    pub fn lead_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "lead",
            id: id.to_string(),
        }
    }

    /// Shorthand for a `NotFound` over an agent id.
    pub fn agent_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "agent",
            id: id.to_string(),
        }
    }
}
