//! # Fan-out Dispatcher
//!
//! Translates persistence-layer outcomes into room-scoped event delivery.
//! Three delivery shapes exist:
//!
//! - to a set of user rooms (`chat:new`, `chat:update`)
//! - to one chat room excluding the sender's connection (`message:new`)
//! - to one chat room with no exclusion (`chat:ai`)
//!
//! Dispatch is fire-and-forget: a recipient that is offline or not subscribed
//! simply receives nothing, and failure to deliver to one recipient never
//! affects the others.

use crate::room::RoomId;
use crate::state::RelayState;
use shared::dto::chat::{ChatSummary, Message};
use shared::event::{AiStreamEvent, ServerEvent};
use tracing::debug;
use uuid::Uuid;

impl RelayState {
    /// Broadcast the full presence snapshot to every live connection.
    pub async fn emit_online_users(&self, users: Vec<String>) {
        let delivered = self
            .router
            .send_to_all(&ServerEvent::OnlineUsers(users))
            .await;
        debug!(delivered, "online:users broadcast");
    }

    /// Announce a newly created chat to each participant's user room,
    /// including the creator (their other clients need it too).
    pub async fn emit_new_chat(&self, participant_ids: &[String], chat: &ChatSummary) {
        let event = ServerEvent::ChatNew(chat.clone());
        for user_id in participant_ids {
            self.router
                .send_to_room(&RoomId::User(user_id.clone()), &event, None)
                .await;
        }
        debug!(chat_id = %chat.id, recipients = participant_ids.len(), "chat:new dispatched");
    }

    /// Deliver a persisted message to the chat room, excluding the sender's
    /// own connection so they do not receive an echo of what their client
    /// already rendered optimistically.
    ///
    /// `origin` is the connection the send came from, when the sender
    /// supplied one; otherwise the presence registry's entry for the sender
    /// is used. A sender with no live connection gets no exclusion, which is
    /// harmless: there is no connection to echo to.
    pub async fn emit_new_message(
        &self,
        chat_id: &str,
        sender_id: &str,
        origin: Option<Uuid>,
        message: &Message,
    ) {
        let exclude = match origin {
            Some(conn) => Some(conn),
            None => self.presence.connection_of(sender_id).await,
        };
        let delivered = self
            .router
            .send_to_room(
                &RoomId::Chat(chat_id.to_string()),
                &ServerEvent::MessageNew(message.clone()),
                exclude,
            )
            .await;
        debug!(chat_id, sender_id, delivered, "message:new dispatched");
    }

    /// Refresh every participant's chat list with the latest message. Unlike
    /// `message:new` this reaches participants who are not currently viewing
    /// the chat, and it is not sender-excluded.
    pub async fn emit_chat_update(
        &self,
        chat_id: &str,
        participant_ids: &[String],
        last_message: &Message,
    ) {
        let event = ServerEvent::ChatUpdate {
            chat_id: chat_id.to_string(),
            last_message: last_message.clone(),
        };
        for user_id in participant_ids {
            self.router
                .send_to_room(&RoomId::User(user_id.clone()), &event, None)
                .await;
        }
        debug!(chat_id, recipients = participant_ids.len(), "chat:update dispatched");
    }

    /// Forward one assistant stream event to the chat room. The relay keeps
    /// no per-stream state; accumulation is the client's job.
    pub async fn emit_ai_event(&self, event: AiStreamEvent) {
        let chat_id = event.chat_id.clone();
        self.router
            .send_to_room(
                &RoomId::Chat(chat_id.clone()),
                &ServerEvent::ChatAi(event),
                None,
            )
            .await;
        debug!(chat_id, "chat:ai dispatched");
    }
}
