// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events streams for real-time notifications.
//!
//! `GET /v1/leads/events?agent_id=...&token=...` streams an agent's
//! assignment events; `GET /v1/admin/events?token=...` streams presence
//! changes for dashboards. EventSource cannot set headers, so the bearer
//! token is accepted as a query parameter.
//!
//! SSE event format:
//! ```text
//! event: lead_assigned
//! data: {"type": "lead_assigned", "lead_id": "...", "method": "automatic"}
//! ```
//!
//! Each connection is one independent hub channel; closing the stream
//! unsubscribes it without affecting the agent's other tabs.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;

use leadflow_core::{AdminEvent, AgentEvent, AgentId, LeadStore};
use leadflow_engine::NotificationHub;

use crate::server::GatewayState;

/// Keep-alive comment cadence, matching typical proxy idle timeouts.
const KEEP_ALIVE_SECS: u64 = 25;

/// Query parameters for the agent event stream.
#[derive(Debug, Deserialize)]
pub struct AgentEventsQuery {
    pub agent_id: AgentId,
    #[serde(default)]
    pub token: Option<String>,
}

/// Query parameters for the admin event stream.
#[derive(Debug, Deserialize)]
pub struct AdminEventsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Stream over one agent subscription; unsubscribes from the hub on drop.
struct AgentEventStream {
    hub: Arc<NotificationHub>,
    agent_id: AgentId,
    subscription_id: u64,
    rx: mpsc::Receiver<AgentEvent>,
}

impl Stream for AgentEventStream {
    type Item = Result<Event, std::convert::Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(agent_sse_event(&event)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for AgentEventStream {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.agent_id, self.subscription_id);
    }
}

/// Stream over one admin subscription; unsubscribes from the hub on drop.
struct AdminEventStream {
    hub: Arc<NotificationHub>,
    subscription_id: u64,
    rx: mpsc::Receiver<AdminEvent>,
}

impl Stream for AdminEventStream {
    type Item = Result<Event, std::convert::Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(admin_sse_event(&event)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for AdminEventStream {
    fn drop(&mut self) {
        self.hub.unsubscribe_admin(self.subscription_id);
    }
}

fn agent_event_name(event: &AgentEvent) -> &'static str {
    match event {
        AgentEvent::Hello { .. } => "hello",
        AgentEvent::LeadAssigned { .. } => "lead_assigned",
        AgentEvent::LeadRequeued { .. } => "lead_requeued",
    }
}

fn agent_sse_event(event: &AgentEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(agent_event_name(event)).data(data)
}

fn admin_sse_event(event: &AdminEvent) -> Event {
    let name = match event {
        AdminEvent::Hello { .. } => "hello",
        AdminEvent::PresenceChanged { .. } => "presence",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(data)
}

fn authorized(state: &GatewayState, token: Option<&str>) -> bool {
    state.auth.token_matches(token)
}

/// GET /v1/leads/events
///
/// Per-agent assignment event stream. Opens with a `hello` event so clients
/// can confirm the subscription is live.
pub async fn agent_events(
    State(state): State<GatewayState>,
    Query(query): Query<AgentEventsQuery>,
) -> Response {
    if !authorized(&state, query.token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    // Unknown agents get a clean 404 instead of a silent dead stream.
    match state.store.get_agent(query.agent_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return crate::handlers::error_response(e),
    }

    let subscription = state.hub.subscribe(query.agent_id);
    let stream = AgentEventStream {
        hub: state.hub.clone(),
        agent_id: query.agent_id,
        subscription_id: subscription.id,
        rx: subscription.rx,
    };

    let hello = futures::stream::once(async {
        Ok(agent_sse_event(&AgentEvent::Hello { at: Utc::now() }))
    });
    let stream = futures::StreamExt::chain(hello, stream);

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(KEEP_ALIVE_SECS))
                .text("keep-alive"),
        )
        .into_response()
}

/// GET /v1/admin/events
///
/// Presence-change stream for admin dashboards.
pub async fn admin_events(
    State(state): State<GatewayState>,
    Query(query): Query<AdminEventsQuery>,
) -> Response {
    if !authorized(&state, query.token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let subscription = state.hub.subscribe_admin();
    let stream = AdminEventStream {
        hub: state.hub.clone(),
        subscription_id: subscription.id,
        rx: subscription.rx,
    };

    let hello = futures::stream::once(async {
        Ok(admin_sse_event(&AdminEvent::Hello { at: Utc::now() }))
    });
    let stream = futures::StreamExt::chain(hello, stream);

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(KEEP_ALIVE_SECS))
                .text("keep-alive"),
        )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_core::{AssignmentMethod, LeadId};

    #[test]
    fn event_names_follow_the_wire_contract() {
        assert_eq!(
            agent_event_name(&AgentEvent::Hello { at: Utc::now() }),
            "hello"
        );
        assert_eq!(
            agent_event_name(&AgentEvent::LeadAssigned {
                lead_id: LeadId::new(),
                method: AssignmentMethod::Automatic,
            }),
            "lead_assigned"
        );
        assert_eq!(
            agent_event_name(&AgentEvent::LeadRequeued {
                lead_id: LeadId::new()
            }),
            "lead_requeued"
        );
    }

    #[tokio::test]
    async fn dropping_the_stream_unsubscribes_from_the_hub() {
        let hub = Arc::new(NotificationHub::new());
        let agent_id = AgentId::new();
        let subscription = hub.subscribe(agent_id);
        assert_eq!(hub.subscriber_count(), 1);

        let stream = AgentEventStream {
            hub: hub.clone(),
            agent_id,
            subscription_id: subscription.id,
            rx: subscription.rx,
        };
        drop(stream);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
