//! # Chat Repository
//!
//! Database access layer for chats and their participant sets. This is where
//! the relay's participant-authorization check bottoms out.

use super::message_repository::MessageRepository;
use super::models::{ChatRow, User};
use super::DbPool;
use crate::error::{AppError, Result};
use chrono::Utc;
use shared::dto::chat::ChatSummary;
use sqlx::query_as;
use uuid::Uuid;

/// Chat repository for database operations.
pub struct ChatRepository;

impl ChatRepository {
    /// Create a chat with the given participant set (creator included) and
    /// return its summary.
    pub async fn create(
        pool: &DbPool,
        participant_ids: &[String],
        is_group: bool,
        group_name: Option<&str>,
    ) -> Result<ChatSummary> {
        if participant_ids.len() < 2 {
            return Err(AppError::InvalidInput(
                "A chat needs at least two participants".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO chats (id, is_group, group_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(is_group)
        .bind(group_name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        for user_id in participant_ids {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO chat_participants (chat_id, user_id)
                VALUES (?, ?)
                "#,
            )
            .bind(&id)
            .bind(user_id)
            .execute(pool)
            .await?;
        }

        Self::summary(pool, &id)
            .await?
            .ok_or_else(|| AppError::Internal("Chat vanished after insert".to_string()))
    }

    /// Membership check backing `chat:join` authorization and message sends.
    pub async fn is_participant(pool: &DbPool, chat_id: &str, user_id: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM chat_participants
            WHERE chat_id = ? AND user_id = ?
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    /// Ids of every participant of a chat.
    pub async fn participant_ids(pool: &DbPool, chat_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT user_id
            FROM chat_participants
            WHERE chat_id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Full summary of one chat: participants plus newest message.
    pub async fn summary(pool: &DbPool, chat_id: &str) -> Result<Option<ChatSummary>> {
        let Some(row) = query_as::<_, ChatRow>(
            r#"
            SELECT id, is_group, group_name, created_at, updated_at
            FROM chats
            WHERE id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_optional(pool)
        .await?
        else {
            return Ok(None);
        };

        let participants = query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.avatar, u.is_ai, u.created_at
            FROM users u
            JOIN chat_participants cp ON cp.user_id = u.id
            WHERE cp.chat_id = ?
            ORDER BY u.name
            "#,
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|u| u.public())
        .collect();

        let last_message = MessageRepository::latest_for_chat(pool, chat_id).await?;

        Ok(Some(ChatSummary {
            id: row.id,
            is_group: row.is_group,
            group_name: row.group_name,
            participants,
            last_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Every chat the user participates in, newest activity first.
    pub async fn list_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<ChatSummary>> {
        let chat_ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT c.id
            FROM chats c
            JOIN chat_participants cp ON cp.chat_id = c.id
            WHERE cp.user_id = ?
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut chats = Vec::with_capacity(chat_ids.len());
        for chat_id in chat_ids {
            if let Some(summary) = Self::summary(pool, &chat_id).await? {
                chats.push(summary);
            }
        }

        Ok(chats)
    }

    /// Bump a chat's activity timestamp (called on every new message).
    pub async fn touch(pool: &DbPool, chat_id: &str) -> Result<()> {
        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(chat_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
