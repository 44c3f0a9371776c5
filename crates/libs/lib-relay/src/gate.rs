//! # Participant Gate
//!
//! The external authorization check consulted before a connection may join a
//! chat room. The relay never decides membership itself; it only mirrors the
//! persistence layer's answer into room subscriptions.

use async_trait::async_trait;
use lib_core::model::store::ChatRepository;
use lib_core::{DbPool, Result};

/// Confirms whether a user is a participant of a chat.
///
/// Implementations may hit a database, so callers must not hold relay locks
/// across the await.
#[async_trait]
pub trait ParticipantGate: Send + Sync {
    async fn is_participant(&self, chat_id: &str, user_id: &str) -> Result<bool>;
}

/// Gate backed by the persistence layer.
pub struct StoreGate {
    pool: DbPool,
}

impl StoreGate {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantGate for StoreGate {
    async fn is_participant(&self, chat_id: &str, user_id: &str) -> Result<bool> {
        ChatRepository::is_participant(&self.pool, chat_id, user_id).await
    }
}
