// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Leadflow distribution engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query operations for
//! leads, agents, distribution rules, and the assignment audit trail.
//!
//! The guarded assignment transition lives in [`queries::leads::claim_lead`]:
//! a conditional UPDATE whose affected-row count is the only concurrency
//! control the engine relies on.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteLeadStore;
pub use database::Database;
