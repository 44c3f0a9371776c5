//! # Room Router
//!
//! Connection registry and room-subscription table. A room is a named
//! multicast scope; every connection is subscribed to its private per-user
//! room at admission and to chat rooms on validated join.
//!
//! Room keys are a tagged enum rather than concatenated strings, so the user
//! and chat namespaces cannot collide and join/leave always agree on the key.

use shared::event::ServerEvent;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// A multicast scope: the private room of one user, or one chat's room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomId {
    User(String),
    Chat(String),
}

/// Per-connection sender half. Events queued here are drained by the
/// connection's writer task in order.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    pub user_id: String,
    pub tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Debug, Default)]
struct RouterInner {
    conns: HashMap<Uuid, ConnHandle>,
    rooms: HashMap<RoomId, HashSet<Uuid>>,
}

/// Synchronized connection and room-subscription table.
///
/// All mutations go through one lock, so concurrent joins, leaves, and
/// disconnects are applied atomically with respect to each other. Dispatch
/// also holds the write lock: deliveries to a room are serialized, and every
/// member of the room observes events in the same order they were dispatched.
#[derive(Debug, Default)]
pub struct RoomRouter {
    inner: RwLock<RouterInner>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an admitted connection and subscribe it to the user's private
    /// room. The connection id is assigned here and never taken from the
    /// caller, so one connection cannot displace another's registration.
    /// A [`ServerEvent::Connected`] carrying the id is queued inside the
    /// registration lock, making it the first event on every connection.
    pub async fn register(&self, user_id: &str, tx: mpsc::UnboundedSender<ServerEvent>) -> Uuid {
        let mut inner = self.inner.write().await;
        let conn_id = loop {
            let candidate = Uuid::new_v4();
            if !inner.conns.contains_key(&candidate) {
                break candidate;
            }
        };
        let _ = tx.send(ServerEvent::Connected { conn_id });
        inner.conns.insert(
            conn_id,
            ConnHandle {
                user_id: user_id.to_string(),
                tx,
            },
        );
        inner
            .rooms
            .entry(RoomId::User(user_id.to_string()))
            .or_default()
            .insert(conn_id);
        conn_id
    }

    /// Drop a connection and every room subscription it holds.
    pub async fn unregister(&self, conn_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.conns.remove(&conn_id);
        inner.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Subscribe a connection to a room. Idempotent: re-joining an already
    /// joined room never causes duplicate delivery.
    pub async fn join(&self, conn_id: Uuid, room: RoomId) {
        let mut inner = self.inner.write().await;
        if !inner.conns.contains_key(&conn_id) {
            // The connection disconnected while its join was in flight.
            debug!(%conn_id, ?room, "join for unknown connection ignored");
            return;
        }
        inner.rooms.entry(room).or_default().insert(conn_id);
    }

    /// Unsubscribe unconditionally; leaving a room never fails.
    pub async fn leave(&self, conn_id: Uuid, room: &RoomId) {
        let mut inner = self.inner.write().await;
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(&conn_id);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
    }

    pub async fn is_member(&self, conn_id: Uuid, room: &RoomId) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .is_some_and(|members| members.contains(&conn_id))
    }

    /// Deliver an event to every member of a room except `exclude`.
    /// Returns the number of connections the event was queued for.
    ///
    /// Runs under the write lock even though nothing is mutated: concurrent
    /// dispatches to the same room must not interleave, or two members could
    /// observe the room's events in different orders.
    pub async fn send_to_room(
        &self,
        room: &RoomId,
        event: &ServerEvent,
        exclude: Option<Uuid>,
    ) -> usize {
        let inner = self.inner.write().await;
        let Some(members) = inner.rooms.get(room) else {
            return 0;
        };

        let mut delivered = 0;
        for conn_id in members {
            if Some(*conn_id) == exclude {
                continue;
            }
            if let Some(handle) = inner.conns.get(conn_id) {
                // A closed receiver means the connection is tearing down;
                // unregister will clean the tables up.
                if handle.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Deliver an event to every live connection. Serialized like
    /// [`send_to_room`] so broadcasts keep one global order too.
    pub async fn send_to_all(&self, event: &ServerEvent) -> usize {
        let inner = self.inner.write().await;
        let mut delivered = 0;
        for handle in inner.conns.values() {
            if handle.tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub async fn conn_count(&self) -> usize {
        self.inner.read().await.conns.len()
    }
}
