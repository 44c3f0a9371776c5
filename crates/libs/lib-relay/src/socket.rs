//! # WebSocket Endpoint
//!
//! Upgrade handler plus the per-connection reader/writer tasks. The
//! credential is verified *before* the upgrade completes; a bad or missing
//! token gets the same opaque 401 regardless of why verification failed.
//!
//! Each connection runs two tasks: a writer draining the connection's event
//! queue onto the socket (this is the only place events are serialized, so
//! queue order is wire order), and the reader loop below parsing client
//! events until the socket closes.

use crate::server::AppState;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use lib_auth::token::decode_jwt;
use lib_core::{AppError, Result};
use serde::Deserialize;
use shared::event::{ClientEvent, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::RelayState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT, for clients that cannot set an Authorization header on the
    /// upgrade request (browsers).
    pub token: Option<String>,
}

/// `GET /ws` upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response> {
    let token = query
        .token
        .clone()
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| AppError::Unauthorized("websocket credential missing".to_string()))?;

    let claims =
        decode_jwt(&token, &state.config.jwt_secret).map_err(AppError::Unauthorized)?;

    let relay = state.relay.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, relay, claims.sub)))
}

/// Extract a token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
}

async fn handle_socket(socket: WebSocket, relay: Arc<RelayState>, user_id: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Kept aside so acks can be delivered to exactly this connection.
    let ack_tx = tx.clone();

    // Admission assigns the connection id and queues it to the client as the
    // first event on the socket.
    let conn_id = relay.admit(&user_id, tx).await;

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "dropping unserializable event");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = ws_rx.next().await {
        match frame {
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::ChatJoin { chat_id }) => {
                    let error = relay.join_chat(conn_id, &user_id, &chat_id).await;
                    // An ack send only fails if the writer already stopped,
                    // in which case the close path below runs anyway.
                    let _ = ack_tx.send(ServerEvent::JoinAck { chat_id, error });
                }
                Ok(ClientEvent::ChatLeave { chat_id }) => {
                    relay.leave_chat(conn_id, &chat_id).await;
                }
                Err(e) => {
                    debug!(%conn_id, error = %e, "ignoring malformed client event");
                }
            },
            WsMessage::Close(_) => break,
            // Ping/pong are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    relay.disconnect(conn_id, &user_id).await;
    writer.abort();
}
