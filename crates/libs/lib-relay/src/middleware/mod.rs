//! Axum middleware layers.

pub mod mw_auth;

pub use mw_auth::require_auth;
