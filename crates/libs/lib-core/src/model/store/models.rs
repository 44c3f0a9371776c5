//! # Database Row Models
//!
//! Row structs mapped by `sqlx` and their conversions into wire DTOs.

use chrono::{DateTime, Utc};
use shared::dto::chat::{Message, MessageStatus, UserPublic};
use sqlx::FromRow;

/// A user account row.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub avatar: Option<String>,
    pub is_ai: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Strip credentials down to the profile embedded in messages and chats.
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            is_ai: self.is_ai,
        }
    }
}

/// A chat row (participants live in `chat_participants`).
#[derive(Debug, Clone, FromRow)]
pub struct ChatRow {
    pub id: String,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message row. `reply_to` holds the referenced message id; hydration into
/// a nested record happens in the repository, one level deep.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: Option<String>,
    pub image: Option<String>,
    pub reply_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageRow {
    /// Combine the row with its hydrated sender profile and (optionally) the
    /// message it replies to.
    pub fn into_message(self, sender: UserPublic, reply_to: Option<Message>) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender,
            content: self.content,
            image: self.image,
            reply_to: reply_to.map(Box::new),
            created_at: self.created_at,
            updated_at: self.updated_at,
            status: MessageStatus::Sent,
            streaming: false,
        }
    }
}
