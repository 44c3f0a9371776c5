//! # Data Transfer Objects (DTOs)
//!
//! Data structures used for communication between the clients and backend.
//!
//! - [`auth`] - Authentication, signup, and login DTOs
//! - [`chat`] - User profiles, messages, and chat summaries

pub mod auth;
pub mod chat;

pub use auth::*;
pub use chat::*;
