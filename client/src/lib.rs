//! # Relay Client
//!
//! Client-side half of the relay protocol: a reconnecting WebSocket
//! connection ([`ws`]) feeding a local chat store ([`store`]) that reconciles
//! optimistic sends and assistant streams with server-authoritative records.

pub mod store;
pub mod ws;

pub use store::ChatStore;
pub use ws::RelayConnection;
