//! # Chat Data Transfer Objects
//!
//! User profiles, messages, and chat summaries shared between server and
//! clients. Server-assigned ids are authoritative; a client may fabricate a
//! temporary message id which lives only until the server echo replaces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User information embedded in messages and chat summaries (safe to send to
/// any client).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPublic {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_ai: bool,
}

/// Delivery status of a message as seen by the client that created it.
///
/// `Sending` exists only on optimistic, not-yet-confirmed local copies and is
/// never produced by the server. `Failed` marks an optimistic copy or an
/// assistant stream that never completed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    #[default]
    Sent,
    Failed,
}

impl MessageStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, MessageStatus::Sent)
    }
}

/// A chat message.
///
/// `streaming` is true while this is an incomplete assistant reply being
/// reconstructed from `chat:ai` chunks; it becomes false once the
/// authoritative record arrives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender: UserPublic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Box<Message>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "MessageStatus::is_sent")]
    pub status: MessageStatus,
    #[serde(default)]
    pub streaming: bool,
}

impl Message {
    /// Build a server-authoritative message with both timestamps set to now.
    pub fn new(id: String, chat_id: String, sender: UserPublic, content: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            chat_id,
            sender,
            content,
            image: None,
            reply_to: None,
            created_at: now,
            updated_at: now,
            status: MessageStatus::Sent,
            streaming: false,
        }
    }
}

/// Chat summary as shown in a chat list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub participants: Vec<UserPublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a chat (direct or group).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateChatRequest {
    /// Direct chat: the single other participant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    /// Group chat: every participant except the creator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

/// Request to send a message into a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Response after sending a message: the persisted record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageResponse {
    pub message: Message,
}
