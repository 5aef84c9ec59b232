// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/SSE gateway for the Leadflow distribution engine.
//!
//! The gateway is deliberately thin: bearer-token auth, JSON translation,
//! and SSE plumbing around the engine. All decisions about leads, presence,
//! and selection live in `leadflow-engine`.

pub mod admin;
pub mod auth;
pub mod handlers;
pub mod server;
pub mod sse;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState, HealthState, ServerConfig};
