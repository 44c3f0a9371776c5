//! # Authentication Middleware
//!
//! Validates the `Authorization: Bearer <token>` header and injects the
//! verified [`Claims`] into request extensions. Every failure mode (missing
//! header, malformed header, bad signature, expired token) produces the same
//! opaque 401; the sub-reason is only visible in server logs.

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use lib_auth::decode_jwt;
use lib_core::{core_config, AppError};
use tracing::{debug, warn};

/// Authentication middleware for the protected `/api` routes.
///
/// Handlers behind this layer extract the user via `Extension<Claims>`.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("[AUTH] Missing Authorization header");
            AppError::Unauthorized("missing Authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("[AUTH] Invalid Authorization header format");
        AppError::Unauthorized("malformed Authorization header".to_string())
    })?;

    let claims = decode_jwt(token, &core_config().jwt_secret).map_err(|e| {
        warn!("[AUTH] JWT validation failed: {}", e);
        AppError::Unauthorized(e)
    })?;

    debug!("[AUTH] Authenticated user: {} (id: {})", claims.name, claims.sub);

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
