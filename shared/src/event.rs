//! # Relay Wire Events
//!
//! Tagged event enums carried over the relay WebSocket in both directions.
//! The externally visible event names (`online:users`, `chat:join`,
//! `message:new`, ...) are part of the protocol and fixed via `serde(rename)`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::chat::{ChatSummary, Message};

/// Events sent from a client to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Ask to be subscribed to a chat room. Answered with a
    /// [`ServerEvent::JoinAck`] carrying the same `chat_id`.
    #[serde(rename = "chat:join")]
    ChatJoin { chat_id: String },
    /// Leave a chat room. Never fails and is never acknowledged.
    #[serde(rename = "chat:leave")]
    ChatLeave { chat_id: String },
}

/// Events sent from the relay to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// First event on every connection: the connection id the relay assigned.
    /// A client repeats this id as `X-Connection-Id` on HTTP sends so its own
    /// connection can be excluded from the `message:new` echo.
    #[serde(rename = "connected")]
    Connected { conn_id: Uuid },
    /// Full snapshot of online user ids, sent to everyone on every presence
    /// change.
    #[serde(rename = "online:users")]
    OnlineUsers(Vec<String>),
    /// A chat was created that includes the recipient.
    #[serde(rename = "chat:new")]
    ChatNew(ChatSummary),
    /// A new message in a chat room the recipient has joined.
    #[serde(rename = "message:new")]
    MessageNew(Message),
    /// List-ordering hint: a chat's newest message changed.
    #[serde(rename = "chat:update")]
    ChatUpdate {
        chat_id: String,
        last_message: Message,
    },
    /// Incremental assistant reply chunk, or the terminal record.
    #[serde(rename = "chat:ai")]
    ChatAi(AiStreamEvent),
    /// Outcome of a [`ClientEvent::ChatJoin`]; `error` is `None` on success.
    #[serde(rename = "chat:join:ack")]
    JoinAck {
        chat_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// One step of an assistant reply stream.
///
/// While `done` is false the payload carries only a delta; receivers
/// concatenate chunks in arrival order. The terminal event has `done == true`
/// and the complete persisted message, which replaces anything accumulated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiStreamEvent {
    pub chat_id: String,
    #[serde(default)]
    pub chunk: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::chat::UserPublic;

    #[test]
    fn test_server_event_wire_names() {
        let event = ServerEvent::OnlineUsers(vec!["u1".to_string(), "u2".to_string()]);
        let json = serde_json::to_value(&event).expect("event should serialize");

        assert_eq!(json["event"], "online:users");
        assert_eq!(json["data"][0], "u1");
    }

    #[test]
    fn test_client_event_parses_protocol_name() {
        let raw = r#"{"event":"chat:join","data":{"chat_id":"c1"}}"#;
        let event: ClientEvent = serde_json::from_str(raw).expect("event should parse");

        assert_eq!(
            event,
            ClientEvent::ChatJoin {
                chat_id: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_message_status_omitted_when_sent() {
        let sender = UserPublic {
            id: "u1".to_string(),
            name: "Alice".to_string(),
            avatar: None,
            is_ai: false,
        };
        let message = Message::new(
            "m1".to_string(),
            "c1".to_string(),
            sender,
            Some("hi".to_string()),
        );
        let json = serde_json::to_value(&message).expect("message should serialize");

        assert!(json.get("status").is_none());
        assert_eq!(json["streaming"], false);
    }
}
