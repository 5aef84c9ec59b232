// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Leadflow's pluggable backends.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod board;
pub mod observability;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PluginAdapter;
pub use board::BoardAdapter;
pub use observability::ObservabilityAdapter;
pub use store::LeadStore;
