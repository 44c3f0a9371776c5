//! # Chat Handlers
//!
//! Chat creation and retrieval. Creating a chat is the only HTTP operation
//! that fans out `chat:new`; everything else here is plain request/response.

use axum::extract::{Extension, Json, Path, State};
use axum::http::StatusCode;
use lib_auth::Claims;
use lib_core::model::store::{ChatRepository, MessageRepository, UserRepository};
use lib_core::{AppError, Result};
use shared::dto::chat::{ChatSummary, CreateChatRequest, Message};
use tracing::info;

use crate::server::AppState;

/// `POST /api/chat` - create a direct or group chat.
///
/// The creator is always part of the participant set; the request only names
/// the others. Participants are verified to exist before the chat is created.
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatSummary>)> {
    let mut participant_ids = vec![claims.sub.clone()];

    if req.is_group {
        if req.participants.is_empty() {
            return Err(AppError::InvalidInput(
                "A group chat needs at least one other participant".to_string(),
            ));
        }
        participant_ids.extend(req.participants.iter().cloned());
    } else {
        let other = req.participant_id.as_deref().ok_or_else(|| {
            AppError::InvalidInput("A direct chat needs a participant_id".to_string())
        })?;
        participant_ids.push(other.to_string());
    }

    participant_ids.sort();
    participant_ids.dedup();

    for user_id in &participant_ids {
        if UserRepository::find_by_id(&state.db, user_id).await?.is_none() {
            return Err(AppError::InvalidInput(format!(
                "Unknown participant: {}",
                user_id
            )));
        }
    }

    let chat = ChatRepository::create(
        &state.db,
        &participant_ids,
        req.is_group,
        req.group_name.as_deref(),
    )
    .await?;

    info!("[CHAT] created: {} ({} participants)", chat.id, participant_ids.len());

    state.relay.emit_new_chat(&participant_ids, &chat).await;

    Ok((StatusCode::CREATED, Json(chat)))
}

/// `GET /api/chat` - every chat of the authenticated user, newest first.
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ChatSummary>>> {
    let chats = ChatRepository::list_for_user(&state.db, &claims.sub).await?;
    Ok(Json(chats))
}

/// `GET /api/chat/{chat_id}` - one chat, participants only.
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatSummary>> {
    require_participant(&state, &chat_id, &claims.sub).await?;

    let chat = ChatRepository::summary(&state.db, &chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))?;

    Ok(Json(chat))
}

/// `GET /api/chat/{chat_id}/messages` - message history, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<Message>>> {
    require_participant(&state, &chat_id, &claims.sub).await?;

    let messages = MessageRepository::list_for_chat(&state.db, &chat_id).await?;
    Ok(Json(messages))
}

/// Shared membership check for the chat-scoped routes.
pub(crate) async fn require_participant(
    state: &AppState,
    chat_id: &str,
    user_id: &str,
) -> Result<()> {
    if ChatRepository::is_participant(&state.db, chat_id, user_id).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not a participant of this chat".to_string(),
        ))
    }
}
