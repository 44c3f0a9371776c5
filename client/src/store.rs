//! # Chat Store
//!
//! Local chat state reconciled against server events. The store owns two
//! reconciliation rules:
//!
//! - Optimistic sends: a locally fabricated message with a temporary id is
//!   replaced *in place* by the authoritative record, so confirming a send
//!   never grows or reorders the list.
//! - Assistant streams: `chat:ai` chunks accumulate into one streaming
//!   placeholder per chat, and the terminal event's persisted message
//!   replaces the placeholder the same way. A stream that stalls past the
//!   configured timeout is marked failed locally.

use parking_lot::Mutex;
use shared::dto::chat::{ChatSummary, Message, MessageStatus, UserPublic};
use shared::event::{AiStreamEvent, ServerEvent};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn stream_placeholder_id(chat_id: &str) -> String {
    format!("ai-stream:{}", chat_id)
}

#[derive(Default)]
struct Inner {
    chats: Vec<ChatSummary>,
    /// The chat currently open in the UI. Message-level events for any other
    /// chat are dropped; the chat list still reflects them via `chat:update`.
    active_chat: Option<String>,
    messages: HashMap<String, Vec<Message>>,
    online_users: Vec<String>,
    /// Last chunk arrival per chat with an active assistant stream.
    streams: HashMap<String, Instant>,
}

/// Thread-safe local chat state.
#[derive(Default)]
pub struct ChatStore {
    inner: Mutex<Inner>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    // region: --- Reads

    pub fn chats(&self) -> Vec<ChatSummary> {
        self.inner.lock().chats.clone()
    }

    pub fn messages(&self, chat_id: &str) -> Vec<Message> {
        self.inner
            .lock()
            .messages
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn online_users(&self) -> Vec<String> {
        self.inner.lock().online_users.clone()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.inner
            .lock()
            .online_users
            .iter()
            .any(|u| u == user_id)
    }

    // endregion: --- Reads

    // region: --- Local mutations

    /// Replace the full chat list (initial load).
    pub fn set_chats(&self, chats: Vec<ChatSummary>) {
        self.inner.lock().chats = chats;
    }

    /// Open a chat (or close with `None`). Message history for the chat is
    /// loaded separately over HTTP via [`add_or_update`].
    ///
    /// [`add_or_update`]: ChatStore::add_or_update
    pub fn set_active_chat(&self, chat_id: Option<&str>) {
        self.inner.lock().active_chat = chat_id.map(|c| c.to_string());
    }

    /// Fabricate and append an optimistic message into the open chat;
    /// returns the local copy
    /// whose id is the temporary id to pass to [`add_or_update`] once the
    /// server confirms the send.
    ///
    /// [`add_or_update`]: ChatStore::add_or_update
    pub fn send_message(&self, chat_id: &str, sender: UserPublic, content: String) -> Message {
        let mut message = Message::new(
            Uuid::new_v4().to_string(),
            chat_id.to_string(),
            sender,
            Some(content),
        );
        message.status = MessageStatus::Sending;

        self.inner
            .lock()
            .messages
            .entry(chat_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }

    /// Insert or replace a message. A no-op when `chat_id` is not the active
    /// chat; history is refetched on open, so nothing is lost.
    ///
    /// Resolution order: a message with id `temp_id` is replaced in place,
    /// else a message with the incoming record's own id is replaced in place,
    /// else the record is appended. Exactly one of these happens, so the list
    /// grows by at most one.
    pub fn add_or_update(&self, chat_id: &str, message: Message, temp_id: Option<&str>) {
        let mut inner = self.inner.lock();
        if inner.active_chat.as_deref() != Some(chat_id) {
            return;
        }
        let list = inner.messages.entry(chat_id.to_string()).or_default();

        if let Some(temp_id) = temp_id {
            if let Some(slot) = list.iter_mut().find(|m| m.id == temp_id) {
                *slot = message;
                return;
            }
        }
        if let Some(slot) = list.iter_mut().find(|m| m.id == message.id) {
            *slot = message;
            return;
        }
        list.push(message);
    }

    /// Mark a local message as failed (send rejected or never confirmed).
    pub fn mark_failed(&self, chat_id: &str, message_id: &str) {
        let mut inner = self.inner.lock();
        if let Some(list) = inner.messages.get_mut(chat_id) {
            if let Some(message) = list.iter_mut().find(|m| m.id == message_id) {
                message.status = MessageStatus::Failed;
                message.streaming = false;
            }
        }
    }

    // endregion: --- Local mutations

    // region: --- Server events

    /// Fold one server event into local state.
    pub fn apply_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::OnlineUsers(users) => {
                self.inner.lock().online_users = users;
            }
            ServerEvent::ChatNew(chat) => {
                let mut inner = self.inner.lock();
                if !inner.chats.iter().any(|c| c.id == chat.id) {
                    inner.chats.insert(0, chat);
                }
            }
            ServerEvent::MessageNew(message) => {
                let chat_id = message.chat_id.clone();
                self.add_or_update(&chat_id, message, None);
            }
            ServerEvent::ChatUpdate {
                chat_id,
                last_message,
            } => {
                let mut inner = self.inner.lock();
                if let Some(pos) = inner.chats.iter().position(|c| c.id == chat_id) {
                    let mut chat = inner.chats.remove(pos);
                    chat.updated_at = last_message.created_at;
                    chat.last_message = Some(last_message);
                    inner.chats.insert(0, chat);
                }
            }
            ServerEvent::ChatAi(event) => self.apply_ai_event(event),
            // Handshake and join outcomes concern the connection layer, not
            // stored state.
            ServerEvent::Connected { .. } | ServerEvent::JoinAck { .. } => {}
        }
    }

    /// One streaming placeholder per chat accumulates chunks; the terminal
    /// event swaps in the persisted record and ends the stream.
    fn apply_ai_event(&self, event: AiStreamEvent) {
        let placeholder_id = stream_placeholder_id(&event.chat_id);

        if event.done {
            self.inner.lock().streams.remove(&event.chat_id);
            if let Some(message) = event.message {
                self.add_or_update(&event.chat_id, message, Some(&placeholder_id));
            }
            return;
        }

        let mut inner = self.inner.lock();
        if inner.active_chat.as_deref() != Some(event.chat_id.as_str()) {
            return;
        }
        inner.streams.insert(event.chat_id.clone(), Instant::now());
        let list = inner.messages.entry(event.chat_id.clone()).or_default();

        if let Some(placeholder) = list.iter_mut().find(|m| m.id == placeholder_id) {
            if let Some(content) = placeholder.content.as_mut() {
                content.push_str(&event.chunk);
            } else {
                placeholder.content = Some(event.chunk);
            }
        } else {
            let assistant = UserPublic {
                id: "assistant".to_string(),
                name: "Assistant".to_string(),
                avatar: None,
                is_ai: true,
            };
            let mut placeholder = Message::new(
                placeholder_id,
                event.chat_id.clone(),
                assistant,
                Some(event.chunk),
            );
            placeholder.streaming = true;
            list.push(placeholder);
        }
    }

    /// Fail every assistant stream with no activity for `timeout`. Returns
    /// the affected chat ids. Call periodically with the server-advertised
    /// stream timeout.
    pub fn expire_stalled_streams(&self, timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut expired = Vec::new();
        {
            let inner = self.inner.lock();
            for (chat_id, last) in &inner.streams {
                if now.duration_since(*last) >= timeout {
                    expired.push(chat_id.clone());
                }
            }
        }

        for chat_id in &expired {
            self.inner.lock().streams.remove(chat_id);
            self.mark_failed(chat_id, &stream_placeholder_id(chat_id));
        }
        expired
    }

    // endregion: --- Server events
}
