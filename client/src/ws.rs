//! # Relay Connection
//!
//! Reconnecting WebSocket client for the relay. Server events are forwarded
//! onto an `async_channel`; client events (joins and leaves) are queued and
//! written by the connection task. On reconnect the connection re-sends a
//! `chat:join` for every room the caller still wants, since the server keeps
//! no subscriptions for a dead connection.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use shared::event::{ClientEvent, ServerEvent};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const MAX_CONNECTION_ATTEMPTS: u32 = 5;
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Build the relay WebSocket URL from an HTTP base URL.
pub fn relay_url(base_url: &str, token: &str) -> String {
    let ws_base = base_url
        .replace("http://", "ws://")
        .replace("https://", "wss://");
    format!("{}/ws?token={}", ws_base, token)
}

/// Handle to a running relay connection.
pub struct RelayConnection {
    /// Relay-assigned connection id, learned from the `connected` event.
    /// `None` until the first handshake completes; refreshed on reconnect.
    conn_id: Arc<Mutex<Option<Uuid>>>,
    outgoing: async_channel::Sender<ClientEvent>,
}

impl RelayConnection {
    /// Spawn the connection task. Server events arrive on `event_tx`.
    pub fn start(
        base_url: &str,
        token: &str,
        event_tx: async_channel::Sender<ServerEvent>,
    ) -> Self {
        let url = relay_url(base_url, token);
        let (outgoing, outgoing_rx) = async_channel::unbounded();
        let conn_id = Arc::new(Mutex::new(None));

        tokio::spawn(run(url, outgoing_rx, event_tx, conn_id.clone()));

        Self { conn_id, outgoing }
    }

    /// The current connection id, sent as `X-Connection-Id` on HTTP message
    /// sends so the server can exclude this connection from `message:new`
    /// echoes. `None` while (re)connecting; the server then falls back to the
    /// presence registry for the exclusion.
    pub fn connection_id(&self) -> Option<Uuid> {
        *self.conn_id.lock()
    }

    /// Ask the relay to subscribe this connection to a chat room. The
    /// outcome arrives as a [`ServerEvent::JoinAck`].
    pub async fn join_chat(&self, chat_id: &str) {
        let _ = self
            .outgoing
            .send(ClientEvent::ChatJoin {
                chat_id: chat_id.to_string(),
            })
            .await;
    }

    pub async fn leave_chat(&self, chat_id: &str) {
        let _ = self
            .outgoing
            .send(ClientEvent::ChatLeave {
                chat_id: chat_id.to_string(),
            })
            .await;
    }
}

async fn run(
    url: String,
    outgoing_rx: async_channel::Receiver<ClientEvent>,
    event_tx: async_channel::Sender<ServerEvent>,
    conn_id: Arc<Mutex<Option<Uuid>>>,
) {
    let mut reconnect_delay = Duration::from_secs(1);
    let mut attempts = 0u32;
    // Rooms the caller wants to be in, replayed after a reconnect.
    let mut joined: HashSet<String> = HashSet::new();

    loop {
        attempts += 1;
        match connect_async(&url).await {
            Ok((ws_stream, _response)) => {
                info!("relay connection established");
                reconnect_delay = Duration::from_secs(1);
                attempts = 0;

                let (mut write, mut read) = ws_stream.split();

                for chat_id in &joined {
                    let event = ClientEvent::ChatJoin {
                        chat_id: chat_id.clone(),
                    };
                    if send_event(&mut write, &event).await.is_err() {
                        break;
                    }
                }

                loop {
                    tokio::select! {
                        frame = read.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(ServerEvent::Connected { conn_id: assigned }) => {
                                        debug!(%assigned, "relay assigned connection id");
                                        *conn_id.lock() = Some(assigned);
                                    }
                                    Ok(event) => {
                                        if event_tx.send(event).await.is_err() {
                                            // Receiver gone; the client is shutting down.
                                            return;
                                        }
                                    }
                                    Err(e) => warn!(error = %e, "ignoring malformed server event"),
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if write.send(Message::Pong(data)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("relay connection closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!(error = %e, "relay read error");
                                break;
                            }
                        },
                        event = outgoing_rx.recv() => match event {
                            Ok(event) => {
                                match &event {
                                    ClientEvent::ChatJoin { chat_id } => {
                                        joined.insert(chat_id.clone());
                                    }
                                    ClientEvent::ChatLeave { chat_id } => {
                                        joined.remove(chat_id);
                                    }
                                }
                                if send_event(&mut write, &event).await.is_err() {
                                    break;
                                }
                            }
                            Err(_) => {
                                // All handles dropped; close cleanly.
                                let _ = write.send(Message::Close(None)).await;
                                return;
                            }
                        },
                    }
                }

                // The old id no longer identifies a live connection.
                *conn_id.lock() = None;
                warn!("relay connection lost, reconnecting...");
            }
            Err(e) => {
                error!(error = %e, attempt = attempts, "relay connection failed");
                if attempts >= MAX_CONNECTION_ATTEMPTS {
                    error!("giving up after {} attempts", MAX_CONNECTION_ATTEMPTS);
                    return;
                }
            }
        }

        debug!(delay_secs = reconnect_delay.as_secs(), "reconnecting");
        sleep(reconnect_delay).await;
        reconnect_delay = (reconnect_delay * 2).min(MAX_RECONNECT_DELAY);
    }
}

async fn send_event<S>(write: &mut S, event: &ClientEvent) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "dropping unserializable client event");
            return Ok(());
        }
    };
    write.send(Message::Text(text.into())).await.map_err(|_| ())
}
