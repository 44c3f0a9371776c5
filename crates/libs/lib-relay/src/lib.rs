//! # Relay Library
//!
//! The real-time delivery subsystem of the chat backend: connection
//! authentication, presence tracking, room routing, fan-out dispatch, and
//! assistant reply streaming, plus the HTTP handlers that trigger fan-out.

pub mod ai;
pub mod fanout;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod presence;
pub mod room;
pub mod server;
pub mod socket;
pub mod state;

pub use gate::{ParticipantGate, StoreGate};
pub use presence::PresenceRegistry;
pub use room::{RoomId, RoomRouter};
pub use server::{start_server, AppState, ServerConfig};
pub use state::RelayState;
