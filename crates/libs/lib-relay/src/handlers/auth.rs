//! # Authentication Handlers
//!
//! Signup and login. Both hand out a JWT that later authenticates the
//! WebSocket connection; login failures are deliberately indistinguishable
//! (unknown email and wrong password produce the same response).

use axum::extract::{Json, State};
use axum::http::StatusCode;
use lib_auth::{encode_jwt, hash_password, verify_password};
use lib_core::model::store::UserRepository;
use lib_core::{AppError, Result};
use shared::dto::auth::{AuthResponse, LoginRequest, SignupRequest};
use tracing::{info, warn};

use crate::server::AppState;

/// `POST /api/auth/signup` - create a new user account.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    info!("[SIGNUP] new account request: {}", req.email);

    if req.name.trim().len() < 2 {
        return Err(AppError::InvalidInput(
            "Name must be at least 2 characters".to_string(),
        ));
    }
    if !req.email.contains('@') {
        return Err(AppError::InvalidInput("Invalid email format".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if UserRepository::find_by_email(&state.db, &req.email)
        .await?
        .is_some()
    {
        warn!("[SIGNUP] email already registered: {}", req.email);
        return Err(AppError::InvalidInput(
            "Email already registered".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(AppError::Internal)?;
    let user = UserRepository::create(&state.db, req.name.trim(), &req.email, &password_hash).await?;

    let token = encode_jwt(
        &user.id,
        user.name.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )
    .map_err(AppError::Internal)?;

    info!("[SIGNUP] user created: {} ({})", user.name, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.public(),
            token,
            message: "Signup successful".to_string(),
        }),
    ))
}

/// `POST /api/auth/login` - authenticate an existing user.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    info!("[LOGIN] attempt: {}", req.email);

    let user = UserRepository::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown email".to_string()))?;

    // The assistant row has no password and can never log in.
    let stored_hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("account has no password".to_string()))?;

    let valid = verify_password(&req.password, stored_hash).map_err(AppError::Internal)?;
    if !valid {
        warn!("[LOGIN] invalid password for {}", req.email);
        return Err(AppError::Unauthorized("invalid password".to_string()));
    }

    let token = encode_jwt(
        &user.id,
        user.name.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )
    .map_err(AppError::Internal)?;

    info!("[LOGIN] user authenticated: {} ({})", user.name, user.id);

    Ok(Json(AuthResponse {
        user: user.public(),
        token,
        message: "Login successful".to_string(),
    }))
}
