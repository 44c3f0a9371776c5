//! # HTTP Handler Tests
//!
//! End-to-end tests driving the full router with `tower::ServiceExt::oneshot`
//! against an in-memory database, including the fan-out that message sends
//! trigger on the relay.

use crate::gate::StoreGate;
use crate::server::{app, AppState, MIGRATOR};
use crate::state::RelayState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::dto::auth::{AuthResponse, LoginRequest, SignupRequest};
use shared::dto::chat::{ChatSummary, CreateChatRequest, SendMessageRequest, SendMessageResponse};
use shared::event::ServerEvent;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::ServiceExt;

const TEST_SECRET: &str = "test-secret-key-must-be-at-least-32-characters!";

fn test_config() -> lib_core::Config {
    lib_core::Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        jwt_expiration_hours: 24,
        frontend_origin: "http://localhost:3000".to_string(),
        ai_chunk_millis: 1,
        ai_stream_timeout_secs: 30,
    }
}

/// The auth middleware reads the global config, so tests pin it to the same
/// secret the test state uses. Repeated init attempts are fine.
fn ensure_global_config() {
    std::env::set_var("JWT_SECRET", TEST_SECRET);
    let _ = lib_core::init_config();
}

async fn test_app() -> (Router, AppState) {
    ensure_global_config();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    MIGRATOR
        .run(&pool)
        .await
        .expect("Migrations should apply cleanly");

    let relay = Arc::new(RelayState::new(Arc::new(StoreGate::new(pool.clone()))));
    let state = AppState {
        db: pool,
        config: test_config(),
        relay,
    };

    (app(state.clone()), state)
}

async fn request<B: Serialize>(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&B>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(body) => Body::from(serde_json::to_string(body).expect("Body should serialize")),
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).expect("Request should build"))
        .await
        .expect("Request should complete")
}

async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Body should be readable");
    serde_json::from_slice(&body).expect("Body should be valid JSON")
}

async fn signup(app: &Router, name: &str, email: &str) -> AuthResponse {
    let req = SignupRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: "TestPassword123!".to_string(),
    };
    let response = request(app, "POST", "/api/auth/signup", None, Some(&req)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

fn direct_chat_req(other: &str) -> CreateChatRequest {
    CreateChatRequest {
        participant_id: Some(other.to_string()),
        is_group: false,
        participants: vec![],
        group_name: None,
    }
}

fn text_message_req(content: &str) -> SendMessageRequest {
    SendMessageRequest {
        content: Some(content.to_string()),
        image: None,
        reply_to: None,
    }
}

#[tokio::test]
async fn test_signup_then_login() {
    // Arrange
    let (app, _state) = test_app().await;
    let signed_up = signup(&app, "testuser", "test@example.com").await;
    assert_eq!(signed_up.message, "Signup successful");

    // Act
    let login_req = LoginRequest {
        email: "test@example.com".to_string(),
        password: "TestPassword123!".to_string(),
    };
    let response = request(&app, "POST", "/api/auth/login", None, Some(&login_req)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let auth: AuthResponse = read_json(response).await;
    assert_eq!(auth.user.name, "testuser");
    assert_eq!(auth.user.id, signed_up.user.id);
    assert_eq!(auth.message, "Login successful");
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    // Arrange
    let (app, _state) = test_app().await;
    let req = SignupRequest {
        name: "testuser".to_string(),
        email: "test@example.com".to_string(),
        password: "short".to_string(),
    };

    // Act
    let response = request(&app, "POST", "/api/auth/signup", None, Some(&req)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    // Arrange
    let (app, _state) = test_app().await;
    signup(&app, "testuser", "test@example.com").await;

    // Act: wrong password vs. unknown email
    let wrong_password = LoginRequest {
        email: "test@example.com".to_string(),
        password: "WrongPassword1!".to_string(),
    };
    let unknown_email = LoginRequest {
        email: "nobody@example.com".to_string(),
        password: "TestPassword123!".to_string(),
    };
    let r1 = request(&app, "POST", "/api/auth/login", None, Some(&wrong_password)).await;
    let r2 = request(&app, "POST", "/api/auth/login", None, Some(&unknown_email)).await;

    // Assert: same status, same body
    assert_eq!(r1.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(r2.status(), StatusCode::UNAUTHORIZED);
    let b1: serde_json::Value = read_json(r1).await;
    let b2: serde_json::Value = read_json(r2).await;
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, _state) = test_app().await;

    let response = request::<()>(&app, "GET", "/api/chat", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = request::<()>(&app, "GET", "/api/chat", Some("garbage.token"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_message_fans_out_to_other_participant() {
    // Arrange
    let (app, state) = test_app().await;
    let alice = signup(&app, "alice", "alice@example.com").await;
    let bob = signup(&app, "bob", "bob@example.com").await;

    // Bob is connected to the relay.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let bob_conn = state.relay.admit(&bob.user.id, tx).await;

    // Alice creates a direct chat with Bob.
    let response = request(
        &app,
        "POST",
        "/api/chat",
        Some(&alice.token),
        Some(&direct_chat_req(&bob.user.id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let chat: ChatSummary = read_json(response).await;

    // Bob's user room received chat:new.
    let mut saw_chat_new = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, ServerEvent::ChatNew(ref c) if c.id == chat.id) {
            saw_chat_new = true;
        }
    }
    assert!(saw_chat_new, "Bob should be told about the new chat");

    // Bob joins the chat room; the gate confirms membership from the store.
    assert!(state
        .relay
        .join_chat(bob_conn, &bob.user.id, &chat.id)
        .await
        .is_none());

    // Act: Alice sends a message over HTTP.
    let response = request(
        &app,
        "POST",
        &format!("/api/chat/{}/messages", chat.id),
        Some(&alice.token),
        Some(&text_message_req("hello bob")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let sent: SendMessageResponse = read_json(response).await;
    assert_eq!(sent.message.content.as_deref(), Some("hello bob"));

    // Assert: Bob receives exactly one message:new plus a chat:update.
    let mut message_new = 0;
    let mut chat_update = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            ServerEvent::MessageNew(m) => {
                assert_eq!(m.id, sent.message.id);
                message_new += 1;
            }
            ServerEvent::ChatUpdate { chat_id, last_message } => {
                assert_eq!(chat_id, chat.id);
                assert_eq!(last_message.id, sent.message.id);
                chat_update += 1;
            }
            _ => {}
        }
    }
    assert_eq!(message_new, 1);
    assert_eq!(chat_update, 1);
}

#[tokio::test]
async fn test_send_message_rejects_non_participant() {
    // Arrange
    let (app, _state) = test_app().await;
    let alice = signup(&app, "alice", "alice@example.com").await;
    let bob = signup(&app, "bob", "bob@example.com").await;
    let carol = signup(&app, "carol", "carol@example.com").await;

    let response = request(
        &app,
        "POST",
        "/api/chat",
        Some(&alice.token),
        Some(&direct_chat_req(&bob.user.id)),
    )
    .await;
    let chat: ChatSummary = read_json(response).await;

    // Act
    let response = request(
        &app,
        "POST",
        &format!("/api/chat/{}/messages", chat.id),
        Some(&carol.token),
        Some(&text_message_req("let me in")),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_assistant_reply_streams_into_chat_room() {
    // Arrange: the migration seeds the assistant account.
    let (app, state) = test_app().await;
    let alice = signup(&app, "alice", "alice@example.com").await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = state.relay.admit(&alice.user.id, tx).await;

    let response = request(
        &app,
        "POST",
        "/api/chat",
        Some(&alice.token),
        Some(&direct_chat_req("assistant")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let chat: ChatSummary = read_json(response).await;
    assert!(state
        .relay
        .join_chat(conn, &alice.user.id, &chat.id)
        .await
        .is_none());

    // Act
    let response = request(
        &app,
        "POST",
        &format!("/api/chat/{}/messages", chat.id),
        Some(&alice.token),
        Some(&text_message_req("hello assistant")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Assert: chunks arrive, then the terminal event whose persisted message
    // equals the concatenation of the chunks.
    let mut accumulated = String::new();
    let final_message = loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("Assistant stream should finish in time")
            .expect("Relay channel should stay open");
        if let ServerEvent::ChatAi(ev) = event {
            assert_eq!(ev.chat_id, chat.id);
            if ev.done {
                break ev.message.expect("Terminal event should carry the message");
            }
            accumulated.push_str(&ev.chunk);
        }
    };

    assert_eq!(final_message.content.as_deref(), Some(accumulated.as_str()));
    assert!(final_message.sender.is_ai);
    assert_eq!(final_message.chat_id, chat.id);
}
