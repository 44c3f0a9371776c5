//! # Authentication Library
//!
//! Password hashing and JWT token management for the chat backend. The relay
//! verifies connection credentials with [`decode_jwt`]; the HTTP auth
//! handlers issue tokens with [`encode_jwt`].

pub mod pwd;
pub mod token;

// Re-export commonly used types
pub use pwd::{hash_password, verify_password};
pub use token::{decode_jwt, encode_jwt, Claims};
