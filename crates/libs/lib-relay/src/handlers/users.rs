//! # User Handlers
//!
//! Contact listing for the chat-creation picker.

use axum::extract::{Extension, Json, State};
use lib_auth::Claims;
use lib_core::model::store::UserRepository;
use lib_core::Result;
use shared::dto::chat::UserPublic;

use crate::server::AppState;

/// `GET /api/users` - every account except the requester, for the contact
/// picker. The assistant is included so it can be added to chats.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserPublic>>> {
    let users = UserRepository::list_all(&state.db)
        .await?
        .into_iter()
        .filter(|u| u.id != claims.sub)
        .map(|u| u.public())
        .collect();

    Ok(Json(users))
}
