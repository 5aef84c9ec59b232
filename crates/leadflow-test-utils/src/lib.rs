// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadflow integration tests.
//!
//! Provides an in-memory [`MemoryLeadStore`] with the same guarded-claim
//! semantics as the SQLite adapter, plus fixture builders for leads, agents,
//! and distribution rules.

pub mod fixtures;
pub mod memory_store;

pub use fixtures::{make_agent, make_lead, make_recovery_lead, make_rule};
pub use memory_store::MemoryLeadStore;
