//! # Presence Registry
//!
//! Maps each user to their single currently-active connection. The model is
//! deliberately one-connection-per-user: a new connection for the same user
//! supersedes the previous entry (last-connect-wins), and an entry is removed
//! only when the *currently registered* connection disconnects, so a late
//! disconnect from a superseded connection never evicts a fresher one.
//!
//! The registry is a plain injectable value owned by
//! [`RelayState`](crate::state::RelayState); tests construct their own.

use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Synchronized user-id to connection-id store.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<String, Uuid>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `user_id` and return the snapshot of
    /// online users taken at this moment, for broadcast.
    pub async fn set_online(&self, user_id: &str, conn_id: Uuid) -> Vec<String> {
        let mut entries = self.entries.write().await;
        entries.insert(user_id.to_string(), conn_id);
        Self::snapshot(&entries)
    }

    /// Remove the entry for `user_id` only if it still points at `conn_id`.
    ///
    /// Returns `Some(snapshot)` when a removal happened, `None` when the
    /// disconnecting connection had already been superseded.
    pub async fn set_offline(&self, user_id: &str, conn_id: Uuid) -> Option<Vec<String>> {
        let mut entries = self.entries.write().await;
        match entries.get(user_id) {
            Some(current) if *current == conn_id => {
                entries.remove(user_id);
                Some(Self::snapshot(&entries))
            }
            _ => None,
        }
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.entries.read().await.contains_key(user_id)
    }

    /// The connection currently registered for a user, used as the fan-out
    /// sender-exclusion fallback.
    pub async fn connection_of(&self, user_id: &str) -> Option<Uuid> {
        self.entries.read().await.get(user_id).copied()
    }

    pub async fn list_online(&self) -> Vec<String> {
        Self::snapshot(&*self.entries.read().await)
    }

    fn snapshot(entries: &HashMap<String, Uuid>) -> Vec<String> {
        let mut users: Vec<String> = entries.keys().cloned().collect();
        users.sort();
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_connect_wins() {
        let registry = PresenceRegistry::new();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();

        registry.set_online("alice", c1).await;
        registry.set_online("alice", c2).await;

        assert_eq!(registry.connection_of("alice").await, Some(c2));
        assert_eq!(registry.list_online().await, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_disconnect_is_noop() {
        let registry = PresenceRegistry::new();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();

        registry.set_online("alice", c1).await;
        registry.set_online("alice", c2).await;

        // The superseded connection disconnects late.
        assert!(registry.set_offline("alice", c1).await.is_none());
        assert!(registry.is_online("alice").await);

        // The live connection disconnecting does remove the entry.
        let snapshot = registry
            .set_offline("alice", c2)
            .await
            .expect("Matching disconnect should remove the entry");
        assert!(snapshot.is_empty());
        assert!(!registry.is_online("alice").await);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_current_set() {
        let registry = PresenceRegistry::new();
        let snapshot = registry.set_online("bob", Uuid::new_v4()).await;
        assert_eq!(snapshot, vec!["bob".to_string()]);

        let snapshot = registry.set_online("alice", Uuid::new_v4()).await;
        assert_eq!(snapshot, vec!["alice".to_string(), "bob".to_string()]);
    }
}
