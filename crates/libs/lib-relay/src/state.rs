//! # Relay State
//!
//! Owns the two pieces of shared mutable state — the presence registry and
//! the room-subscription table — and the admission / join / disconnect
//! lifecycle around them. Everything else (message buffers, client stores)
//! belongs to a single connection or client.

use crate::gate::ParticipantGate;
use crate::presence::PresenceRegistry;
use crate::room::{RoomId, RoomRouter};
use shared::event::ServerEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Error string surfaced to a client whose `chat:join` was refused. A gate
/// that fails and a gate that errors read identically on purpose.
pub const JOIN_REFUSED: &str = "Unable to join chat";

/// Shared state of the relay subsystem.
pub struct RelayState {
    pub presence: PresenceRegistry,
    pub router: RoomRouter,
    gate: Arc<dyn ParticipantGate>,
    /// Holds a presence mutation and the broadcast of the snapshot it
    /// produced together as one step, so a later change can never publish
    /// its snapshot ahead of an earlier one.
    presence_order: Mutex<()>,
}

impl RelayState {
    pub fn new(gate: Arc<dyn ParticipantGate>) -> Self {
        Self {
            presence: PresenceRegistry::new(),
            router: RoomRouter::new(),
            gate,
            presence_order: Mutex::new(()),
        }
    }

    /// Admit an authenticated connection: register it, subscribe it to its
    /// private user room, mark the user online, and broadcast the presence
    /// snapshot to everyone.
    ///
    /// The relay assigns the connection id and returns it; registration has
    /// already queued it to the client as the connection's first event. The
    /// client repeats the id on HTTP sends so its own connection can be
    /// excluded from the echo.
    pub async fn admit(&self, user_id: &str, tx: mpsc::UnboundedSender<ServerEvent>) -> Uuid {
        let conn_id = self.router.register(user_id, tx).await;

        let _order = self.presence_order.lock().await;
        let snapshot = self.presence.set_online(user_id, conn_id).await;
        self.emit_online_users(snapshot).await;
        drop(_order);

        info!(%conn_id, user_id, "connection admitted");
        conn_id
    }

    /// Tear a connection down. The presence entry is removed (and the
    /// snapshot broadcast) only when this connection is still the one
    /// registered for the user.
    pub async fn disconnect(&self, conn_id: Uuid, user_id: &str) {
        self.router.unregister(conn_id).await;

        let _order = self.presence_order.lock().await;
        if let Some(snapshot) = self.presence.set_offline(user_id, conn_id).await {
            self.emit_online_users(snapshot).await;
            drop(_order);
            info!(%conn_id, user_id, "connection closed, user offline");
        } else {
            drop(_order);
            info!(%conn_id, user_id, "superseded connection closed");
        }
    }

    /// Validate and perform a chat-room join for one connection.
    ///
    /// Returns `None` on success and `Some(error)` when the gate refused or
    /// errored; in both failure cases no subscription is made and nothing
    /// else about the connection changes.
    pub async fn join_chat(&self, conn_id: Uuid, user_id: &str, chat_id: &str) -> Option<String> {
        match self.gate.is_participant(chat_id, user_id).await {
            Ok(true) => {
                self.router
                    .join(conn_id, RoomId::Chat(chat_id.to_string()))
                    .await;
                None
            }
            Ok(false) => {
                warn!(%conn_id, user_id, chat_id, "join refused: not a participant");
                Some(JOIN_REFUSED.to_string())
            }
            Err(e) => {
                warn!(%conn_id, user_id, chat_id, error = %e, "join refused: gate error");
                Some(JOIN_REFUSED.to_string())
            }
        }
    }

    /// Leave a chat room. No authorization needed to leave.
    pub async fn leave_chat(&self, conn_id: Uuid, chat_id: &str) {
        self.router
            .leave(conn_id, &RoomId::Chat(chat_id.to_string()))
            .await;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use lib_core::{AppError, Result};
    use std::collections::HashSet;

    /// Gate with a fixed membership table, plus an error trigger.
    pub struct FixedGate {
        members: HashSet<(String, String)>,
        pub failing_chat: Option<String>,
    }

    impl FixedGate {
        pub fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                members: pairs
                    .iter()
                    .map(|(c, u)| (c.to_string(), u.to_string()))
                    .collect(),
                failing_chat: None,
            }
        }
    }

    #[async_trait]
    impl ParticipantGate for FixedGate {
        async fn is_participant(&self, chat_id: &str, user_id: &str) -> Result<bool> {
            if self.failing_chat.as_deref() == Some(chat_id) {
                return Err(AppError::Internal("gate outage".to_string()));
            }
            Ok(self
                .members
                .contains(&(chat_id.to_string(), user_id.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FixedGate;
    use super::*;
    use shared::event::ServerEvent;

    fn state_with(gate: FixedGate) -> RelayState {
        RelayState::new(Arc::new(gate))
    }

    #[tokio::test]
    async fn test_join_requires_gate_success() {
        let state = state_with(FixedGate::new(&[("c1", "alice")]));
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = state.admit("alice", tx).await;

        assert!(state.join_chat(conn, "alice", "c1").await.is_none());
        assert!(
            state
                .router
                .is_member(conn, &RoomId::Chat("c1".to_string()))
                .await
        );

        assert_eq!(
            state.join_chat(conn, "alice", "c2").await,
            Some(JOIN_REFUSED.to_string())
        );
        assert!(
            !state
                .router
                .is_member(conn, &RoomId::Chat("c2".to_string()))
                .await
        );
    }

    #[tokio::test]
    async fn test_gate_error_reads_like_refusal() {
        let mut gate = FixedGate::new(&[("c1", "alice")]);
        gate.failing_chat = Some("c1".to_string());
        let state = state_with(gate);
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = state.admit("alice", tx).await;

        assert_eq!(
            state.join_chat(conn, "alice", "c1").await,
            Some(JOIN_REFUSED.to_string())
        );
        assert!(
            !state
                .router
                .is_member(conn, &RoomId::Chat("c1".to_string()))
                .await
        );
    }

    #[tokio::test]
    async fn test_admit_announces_id_then_presence() {
        let state = state_with(FixedGate::new(&[]));
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let conn_a = state.admit("alice", tx_a).await;

        // First event is the assigned connection id, then the snapshot
        // containing alice herself.
        match rx_a.recv().await {
            Some(ServerEvent::Connected { conn_id }) => assert_eq!(conn_id, conn_a),
            other => panic!("expected connected, got {:?}", other),
        }
        match rx_a.recv().await {
            Some(ServerEvent::OnlineUsers(users)) => {
                assert_eq!(users, vec!["alice".to_string()])
            }
            other => panic!("expected online:users, got {:?}", other),
        }

        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        state.admit("bob", tx_b).await;

        match rx_a.recv().await {
            Some(ServerEvent::OnlineUsers(users)) => {
                assert_eq!(users, vec!["alice".to_string(), "bob".to_string()])
            }
            other => panic!("expected online:users, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_superseded_disconnect_keeps_user_online() {
        let state = state_with(FixedGate::new(&[]));
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let c1 = state.admit("alice", tx1).await;
        let c2 = state.admit("alice", tx2).await;

        state.disconnect(c1, "alice").await;
        assert!(state.presence.is_online("alice").await);

        state.disconnect(c2, "alice").await;
        assert!(!state.presence.is_online("alice").await);
    }

    #[tokio::test]
    async fn test_admitted_connections_never_share_a_user_room() {
        let state = state_with(FixedGate::new(&[]));
        let (tx_v, mut rx_v) = mpsc::unbounded_channel();
        let (tx_o, mut rx_o) = mpsc::unbounded_channel();

        let victim = state.admit("victim", tx_v).await;
        let other = state.admit("other", tx_o).await;
        assert_ne!(victim, other);

        while matches!(
            rx_v.try_recv(),
            Ok(ServerEvent::Connected { .. } | ServerEvent::OnlineUsers(_))
        ) {}
        while matches!(
            rx_o.try_recv(),
            Ok(ServerEvent::Connected { .. } | ServerEvent::OnlineUsers(_))
        ) {}

        // Delivery to the victim's private room reaches only the victim.
        state
            .router
            .send_to_room(
                &RoomId::User("victim".to_string()),
                &ServerEvent::OnlineUsers(vec!["marker".to_string()]),
                None,
            )
            .await;
        assert!(rx_v.try_recv().is_ok(), "victim must receive their events");
        assert!(
            rx_o.try_recv().is_err(),
            "another user's connection must not capture the room"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_presence_broadcast_matches_final_registry() {
        let state = Arc::new(state_with(FixedGate::new(&[])));
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.admit("observer", tx).await;

        let tasks: Vec<_> = (0..32u32)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move {
                    let (tx, _rx) = mpsc::unbounded_channel();
                    state.admit(&format!("user-{}", i), tx).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("admit task should finish");
        }

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let ServerEvent::OnlineUsers(users) = event {
                last = Some(users);
            }
        }
        let mut last = last.expect("observer should have seen presence broadcasts");
        let mut expected = state.presence.list_online().await;
        last.sort();
        expected.sort();
        assert_eq!(
            last, expected,
            "the newest broadcast must carry the newest snapshot"
        );
    }
}
