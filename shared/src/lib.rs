//! # Shared Data Transfer Objects Library
//!
//! This library defines the contract between the chat clients and the backend:
//! REST DTOs plus the tagged event enums carried over the relay WebSocket.
//!
//! ## Wire Format
//!
//! All DTOs serialize to JSON using the default `serde` behavior:
//! - Field names use **snake_case** in Rust, which maps to **snake_case** in JSON by default
//! - Optional fields are omitted from JSON when `None` (using `#[serde(skip_serializing_if = "Option::is_none")]`)
//! - Relay events are externally tagged as `{"event": "...", "data": {...}}`
//!   with event names like `message:new` and `online:users`

pub mod dto;
pub mod event;

// Re-export commonly used types for convenience
pub use dto::*;
pub use event::{AiStreamEvent, ClientEvent, ServerEvent};
