// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-agent notification fan-out with an admin observer channel.
//!
//! Registration is keyed by agent id with multiset semantics: an agent may
//! hold several simultaneous channels (multiple tabs), each removed
//! independently on disconnect. Delivery is at-most-effort; events are not
//! persisted or retried, and a full or closed channel simply misses the
//! event. An agent with no open channel sees the new lead on its next list
//! call.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use leadflow_core::{AdminEvent, AgentEvent, AgentId};
use tokio::sync::mpsc;
use tracing::debug;

/// Per-channel buffer. Slow consumers drop events rather than block the
/// engine.
const CHANNEL_CAPACITY: usize = 32;

/// A live per-agent subscription handle.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<AgentEvent>,
}

/// A live admin-observer subscription handle.
pub struct AdminSubscription {
    pub id: u64,
    pub rx: mpsc::Receiver<AdminEvent>,
}

/// In-process publish/subscribe hub for real-time events.
#[derive(Default)]
pub struct NotificationHub {
    agent_channels: DashMap<AgentId, Vec<(u64, mpsc::Sender<AgentEvent>)>>,
    admin_channels: DashMap<u64, mpsc::Sender<AdminEvent>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new channel for an agent. Multiple concurrent subscriptions
    /// per agent are expected.
    pub fn subscribe(&self, agent_id: AgentId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.agent_channels.entry(agent_id).or_default().push((id, tx));
        self.update_gauge();
        debug!(%agent_id, subscription = id, "agent channel subscribed");
        Subscription { id, rx }
    }

    /// Remove one of an agent's channels without touching its siblings.
    pub fn unsubscribe(&self, agent_id: AgentId, subscription_id: u64) {
        if let Some(mut channels) = self.agent_channels.get_mut(&agent_id) {
            channels.retain(|(id, _)| *id != subscription_id);
        }
        self.agent_channels
            .remove_if(&agent_id, |_, channels| channels.is_empty());
        self.update_gauge();
        debug!(%agent_id, subscription = subscription_id, "agent channel unsubscribed");
    }

    /// Write an event to every open channel for the agent. Returns how many
    /// channels accepted it; zero subscribers is not an error.
    pub fn publish(&self, agent_id: AgentId, event: AgentEvent) -> usize {
        let mut delivered = 0;
        let mut pruned = false;
        if let Some(mut channels) = self.agent_channels.get_mut(&agent_id) {
            channels.retain(|(_, tx)| match tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => true,
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    pruned = true;
                    false
                }
            });
        }
        if pruned {
            self.agent_channels
                .remove_if(&agent_id, |_, channels| channels.is_empty());
            self.update_gauge();
        }
        delivered
    }

    /// Open an admin observer channel (presence events).
    pub fn subscribe_admin(&self) -> AdminSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.admin_channels.insert(id, tx);
        self.update_gauge();
        AdminSubscription { id, rx }
    }

    /// Remove an admin observer channel.
    pub fn unsubscribe_admin(&self, subscription_id: u64) {
        self.admin_channels.remove(&subscription_id);
        self.update_gauge();
    }

    /// Broadcast an event to all admin observers. Best-effort.
    pub fn publish_admin(&self, event: AdminEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        for entry in self.admin_channels.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*entry.key()),
            }
        }
        for id in dead {
            self.admin_channels.remove(&id);
        }
        delivered
    }

    /// Total open channels across agents and admin observers.
    pub fn subscriber_count(&self) -> usize {
        let agents: usize = self.agent_channels.iter().map(|e| e.value().len()).sum();
        agents + self.admin_channels.len()
    }

    fn update_gauge(&self) {
        leadflow_prometheus::set_sse_subscribers(self.subscriber_count() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadflow_core::{AssignmentMethod, LeadId};

    fn assigned_event() -> AgentEvent {
        AgentEvent::LeadAssigned {
            lead_id: LeadId::new(),
            method: AssignmentMethod::Automatic,
        }
    }

    #[tokio::test]
    async fn publish_reaches_all_of_an_agents_channels() {
        let hub = NotificationHub::new();
        let agent = AgentId::new();
        let mut sub1 = hub.subscribe(agent);
        let mut sub2 = hub.subscribe(agent);

        let delivered = hub.publish(agent, assigned_event());
        assert_eq!(delivered, 2);
        assert!(matches!(
            sub1.rx.recv().await,
            Some(AgentEvent::LeadAssigned { .. })
        ));
        assert!(matches!(
            sub2.rx.recv().await,
            Some(AgentEvent::LeadAssigned { .. })
        ));
    }

    #[tokio::test]
    async fn publish_to_agent_without_channels_is_not_an_error() {
        let hub = NotificationHub::new();
        assert_eq!(hub.publish(AgentId::new(), assigned_event()), 0);
    }

    #[tokio::test]
    async fn events_are_not_cross_delivered_between_agents() {
        let hub = NotificationHub::new();
        let alice = AgentId::new();
        let bob = AgentId::new();
        let mut alice_sub = hub.subscribe(alice);
        let _bob_sub = hub.subscribe(bob);

        hub.publish(alice, assigned_event());
        assert!(alice_sub.rx.recv().await.is_some());
        assert_eq!(hub.publish(bob, assigned_event()), 1);
        // Alice got exactly her one event.
        assert!(alice_sub.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_the_named_channel() {
        let hub = NotificationHub::new();
        let agent = AgentId::new();
        let sub1 = hub.subscribe(agent);
        let mut sub2 = hub.subscribe(agent);

        hub.unsubscribe(agent, sub1.id);
        assert_eq!(hub.subscriber_count(), 1);

        let delivered = hub.publish(agent, assigned_event());
        assert_eq!(delivered, 1);
        assert!(sub2.rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_publish() {
        let hub = NotificationHub::new();
        let agent = AgentId::new();
        let sub = hub.subscribe(agent);
        drop(sub.rx);

        assert_eq!(hub.publish(agent, assigned_event()), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn admin_channel_receives_presence_events() {
        let hub = NotificationHub::new();
        let mut admin = hub.subscribe_admin();

        let delivered = hub.publish_admin(AdminEvent::PresenceChanged {
            agent_id: AgentId::new(),
            handle: "maria".to_string(),
            online: true,
            at: Utc::now(),
        });
        assert_eq!(delivered, 1);
        assert!(matches!(
            admin.rx.recv().await,
            Some(AdminEvent::PresenceChanged { online: true, .. })
        ));

        hub.unsubscribe_admin(admin.id);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
