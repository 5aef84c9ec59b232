// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead assignment and presence-distribution engine.
//!
//! The core of Leadflow: decides, for each ingested lead, which agent
//! receives it, under constraints of eligibility (per-agent weighted rules
//! with category filters), presence (online flag plus heartbeat freshness),
//! fairness (weighted random selection with a deterministic round-robin
//! fallback), and idempotency (a storage-level guarded transition makes
//! double assignment impossible and lost races harmless).
//!
//! Module map:
//! - [`presence`]: who is available right now
//! - [`eligibility`]: who may receive a given lead category, with weights
//! - [`selector`]: roulette-wheel pick with round-robin fallback
//! - [`distributor`]: the lead state machine and its entry points
//! - [`notify`]: per-agent fan-out plus the admin observer channel
//! - [`stats`]: same-day summaries from the audit trail

pub mod distributor;
pub mod eligibility;
pub mod notify;
pub mod presence;
pub mod selector;
pub mod stats;

pub use distributor::{Actor, Distributor};
pub use eligibility::EligibilityResolver;
pub use notify::{AdminSubscription, NotificationHub, Subscription};
pub use presence::PresenceTracker;
pub use selector::{pick, Candidate, RoundRobinCursor, Selection};
