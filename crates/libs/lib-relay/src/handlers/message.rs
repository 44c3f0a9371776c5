//! # Message Handler
//!
//! The send-message operation: persist, then fan out. Persistence failures
//! surface as HTTP errors and nothing is dispatched; after a successful
//! insert the response and the room fan-out carry the same authoritative
//! record.

use axum::extract::{Extension, Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use lib_auth::Claims;
use lib_core::model::store::{ChatRepository, MessageRepository};
use lib_core::Result;
use shared::dto::chat::{SendMessageRequest, SendMessageResponse};
use tracing::info;
use uuid::Uuid;

use crate::ai;
use crate::handlers::chat::require_participant;
use crate::server::AppState;

/// Header naming the WebSocket connection a send originated from, so that
/// connection can be excluded from the `message:new` echo.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// `POST /api/chat/{chat_id}/messages` - send a message into a chat.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(chat_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>)> {
    require_participant(&state, &chat_id, &claims.sub).await?;

    let message = MessageRepository::create(
        &state.db,
        &chat_id,
        &claims.sub,
        req.content.as_deref(),
        req.image.as_deref(),
        req.reply_to.as_deref(),
    )
    .await?;
    ChatRepository::touch(&state.db, &chat_id).await?;

    info!("[MESSAGE] {} -> chat {}", claims.sub, chat_id);

    let origin = origin_connection(&headers);
    state
        .relay
        .emit_new_message(&chat_id, &claims.sub, origin, &message)
        .await;

    let participants = ChatRepository::participant_ids(&state.db, &chat_id).await?;
    state
        .relay
        .emit_chat_update(&chat_id, &participants, &message)
        .await;

    if let Some(assistant) = ai::assistant_in_chat(&state.db, &chat_id).await? {
        if assistant.id != claims.sub {
            ai::spawn_assistant_reply(
                state.db.clone(),
                state.relay.clone(),
                assistant,
                chat_id.clone(),
                state.config.ai_chunk_millis,
            );
        }
    }

    Ok((StatusCode::CREATED, Json(SendMessageResponse { message })))
}

/// Parse the optional `X-Connection-Id` header. An unparseable value is
/// treated as absent; the presence registry then supplies the exclusion.
fn origin_connection(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CONNECTION_ID_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
