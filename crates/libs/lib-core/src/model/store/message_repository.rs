//! # Message Repository
//!
//! Database access layer for messages. This is the message-create operation
//! the relay fans out from: it persists the record, hydrates the sender
//! profile, and resolves `reply_to` one level deep.

use super::models::{MessageRow, User};
use super::DbPool;
use crate::error::{AppError, Result};
use chrono::Utc;
use shared::dto::chat::Message;
use sqlx::query_as;
use uuid::Uuid;

/// Message repository for database operations.
pub struct MessageRepository;

impl MessageRepository {
    /// Persist a new message and return the authoritative record.
    pub async fn create(
        pool: &DbPool,
        chat_id: &str,
        sender_id: &str,
        content: Option<&str>,
        image: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<Message> {
        if content.map_or(true, |c| c.trim().is_empty()) && image.is_none() {
            return Err(AppError::InvalidInput(
                "A message needs content or an image".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, image, reply_to, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .bind(image)
        .bind(reply_to)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, &id)
            .await?
            .ok_or_else(|| AppError::Internal("Message vanished after insert".to_string()))
    }

    /// Load one message with its sender profile and replied-to message.
    pub async fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<Message>> {
        let Some(row) = Self::row_by_id(pool, id).await? else {
            return Ok(None);
        };

        let message = Self::hydrate(pool, row).await?;
        Ok(Some(message))
    }

    /// All messages of a chat, oldest first.
    pub async fn list_for_chat(pool: &DbPool, chat_id: &str) -> Result<Vec<Message>> {
        let rows = query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, sender_id, content, image, reply_to, created_at, updated_at
            FROM messages
            WHERE chat_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            messages.push(Self::hydrate(pool, row).await?);
        }

        Ok(messages)
    }

    /// The newest message of a chat, if any.
    pub async fn latest_for_chat(pool: &DbPool, chat_id: &str) -> Result<Option<Message>> {
        let row = query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, sender_id, content, image, reply_to, created_at, updated_at
            FROM messages
            WHERE chat_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(pool, row).await?)),
            None => Ok(None),
        }
    }

    async fn row_by_id(pool: &DbPool, id: &str) -> Result<Option<MessageRow>> {
        let row = query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, sender_id, content, image, reply_to, created_at, updated_at
            FROM messages
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Attach the sender profile and resolve `reply_to` one level deep.
    /// The nested record's own `reply_to` is left empty to bound the query.
    async fn hydrate(pool: &DbPool, row: MessageRow) -> Result<Message> {
        let sender = query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, is_ai, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(&row.sender_id)
        .fetch_one(pool)
        .await?
        .public();

        let reply_to = match &row.reply_to {
            Some(reply_id) => match Self::row_by_id(pool, reply_id).await? {
                Some(reply_row) => {
                    let reply_sender = query_as::<_, User>(
                        r#"
                        SELECT id, name, email, password_hash, avatar, is_ai, created_at
                        FROM users
                        WHERE id = ?
                        "#,
                    )
                    .bind(&reply_row.sender_id)
                    .fetch_one(pool)
                    .await?
                    .public();
                    Some(reply_row.into_message(reply_sender, None))
                }
                None => None,
            },
            None => None,
        };

        Ok(row.into_message(sender, reply_to))
    }
}
