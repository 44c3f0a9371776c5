//! # Core Library
//!
//! Configuration, error handling, and the persistence layer for the chat
//! backend. The relay treats this crate as an external collaborator with a
//! narrow contract: look up users, confirm chat membership, create messages.

pub mod config;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use config::{core_config, init_config, Config};
pub use error::{AppError, Result};
pub use model::store::{create_pool, DbPool};
