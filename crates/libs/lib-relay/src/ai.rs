//! # Assistant Reply Streaming
//!
//! Simulated assistant replies, streamed into the chat room as `chat:ai`
//! chunk events. The relay stays stateless about streams: nothing here
//! accumulates text for a recipient, and a recipient joining mid-stream
//! simply misses the earlier chunks. The terminal event carries the
//! persisted message, which is the only authoritative copy.

use crate::state::RelayState;
use lib_core::model::store::{ChatRepository, MessageRepository, UserRepository};
use lib_core::model::store::models::User;
use lib_core::{DbPool, Result};
use rand::seq::SliceRandom;
use shared::event::AiStreamEvent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const REPLIES: &[&str] = &[
    "That's a good question! Let me think about it for a second.",
    "Interesting point. Here's how I'd look at it.",
    "I can help with that. The short version is: it depends on context.",
    "Thanks for sharing! Tell me more and I can go deeper.",
    "Here's a thought: try breaking the problem into smaller steps.",
    "Good timing, I was just pondering something similar.",
];

/// The assistant account, when it participates in the given chat.
/// `None` means no reply should be generated.
pub async fn assistant_in_chat(db: &DbPool, chat_id: &str) -> Result<Option<User>> {
    let Some(assistant) = UserRepository::assistant(db).await? else {
        return Ok(None);
    };
    if ChatRepository::is_participant(db, chat_id, &assistant.id).await? {
        Ok(Some(assistant))
    } else {
        Ok(None)
    }
}

/// Pick a canned reply. Kept synchronous so the RNG never crosses an await.
fn pick_reply() -> String {
    let mut rng = rand::thread_rng();
    REPLIES
        .choose(&mut rng)
        .copied()
        .unwrap_or(REPLIES[0])
        .to_string()
}

/// Split a reply into word-sized chunks, each keeping its trailing space so
/// plain concatenation on the client reconstructs the text exactly.
fn split_into_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if ch == ' ' {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Stream a reply from the assistant into the chat room, then persist it and
/// announce the result. Runs detached; failures end the stream early and the
/// clients' own stream expiry cleans up the partial bubble.
pub fn spawn_assistant_reply(
    db: DbPool,
    relay: Arc<RelayState>,
    assistant: User,
    chat_id: String,
    chunk_millis: u64,
) {
    tokio::spawn(async move {
        let reply = pick_reply();
        info!(chat_id, "assistant reply streaming started");

        for chunk in split_into_chunks(&reply) {
            relay
                .emit_ai_event(AiStreamEvent {
                    chat_id: chat_id.clone(),
                    chunk,
                    done: false,
                    message: None,
                })
                .await;
            tokio::time::sleep(Duration::from_millis(chunk_millis)).await;
        }

        let message = match MessageRepository::create(
            &db,
            &chat_id,
            &assistant.id,
            Some(&reply),
            None,
            None,
        )
        .await
        {
            Ok(message) => message,
            Err(e) => {
                error!(chat_id, error = %e, "assistant reply persistence failed");
                return;
            }
        };

        if let Err(e) = ChatRepository::touch(&db, &chat_id).await {
            error!(chat_id, error = %e, "chat activity bump failed");
        }

        relay
            .emit_ai_event(AiStreamEvent {
                chat_id: chat_id.clone(),
                chunk: String::new(),
                done: true,
                message: Some(message.clone()),
            })
            .await;

        match ChatRepository::participant_ids(&db, &chat_id).await {
            Ok(participants) => {
                relay
                    .emit_chat_update(&chat_id, &participants, &message)
                    .await;
            }
            Err(e) => error!(chat_id, error = %e, "participant lookup failed"),
        }

        info!(chat_id, "assistant reply streaming finished");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_concatenate_to_original() {
        for reply in REPLIES {
            let chunks = split_into_chunks(reply);
            assert!(chunks.len() > 1, "replies should stream in several chunks");
            assert_eq!(chunks.concat(), *reply);
        }
    }

    #[test]
    fn test_chunking_edge_inputs() {
        assert!(split_into_chunks("").is_empty());
        assert_eq!(split_into_chunks("one"), vec!["one".to_string()]);
        assert_eq!(
            split_into_chunks("a b"),
            vec!["a ".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_pick_reply_is_canned() {
        let reply = pick_reply();
        assert!(REPLIES.contains(&reply.as_str()));
    }
}
