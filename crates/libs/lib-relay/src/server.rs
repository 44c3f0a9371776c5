//! # Server Setup
//!
//! Router construction and HTTP server startup. [`app`] builds the full
//! router from an [`AppState`] so integration tests can drive it without
//! binding a port; [`start_server`] wires the real dependencies together.

// region: --- Imports
use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use lib_core::{core_config, create_pool, Config, DbPool};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::gate::StoreGate;
use crate::handlers;
use crate::middleware::require_auth;
use crate::socket::ws_handler;
use crate::state::RelayState;
// endregion: --- Imports

/// Embedded migrations, shared by the server and the integration tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../../migrations");

// region: --- AppState
/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub relay: Arc<RelayState>,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
// endregion: --- AppState

// region: --- Server Configuration
/// Server configuration.
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080")
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}
// endregion: --- Server Configuration

// region: --- Server Setup
/// Build the application router.
pub fn app(state: AppState) -> Router {
    use axum::http::{header, HeaderName, HeaderValue, Method};

    let origin: Option<HeaderValue> = state.config.frontend_origin.parse().ok();
    let cors = CorsLayer::new()
        .allow_origin(origin.into_iter().collect::<Vec<_>>())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(handlers::message::CONNECTION_ID_HEADER),
        ]);

    let protected = Router::new()
        .route("/api/users", get(handlers::users::list_users))
        .route(
            "/api/chat",
            post(handlers::chat::create_chat).get(handlers::chat::list_chats),
        )
        .route("/api/chat/{chat_id}", get(handlers::chat::get_chat))
        .route(
            "/api/chat/{chat_id}/messages",
            get(handlers::chat::list_messages).post(handlers::message::send_message),
        )
        .layer(axum::middleware::from_fn(require_auth));

    Router::new()
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .merge(protected)
        // The WebSocket route authenticates inside the handler; the token may
        // arrive as a query parameter instead of a header.
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Initialize and start the HTTP server.
///
/// Expects [`lib_core::init_config`] to have been called by the binary.
pub async fn start_server(server_config: ServerConfig) -> anyhow::Result<()> {
    let config = core_config().clone();

    // Ensure the data directory exists for a file-backed SQLite database.
    if let Some(db_path) = config.database_url.strip_prefix("sqlite:") {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created database directory: {:?}", parent);
            }
        }
    }

    info!("Connecting to database...");
    let pool = create_pool().await?;

    info!("Running database migrations...");
    MIGRATOR.run(&pool).await?;

    let relay = Arc::new(RelayState::new(Arc::new(StoreGate::new(pool.clone()))));
    let state = AppState {
        db: pool,
        config,
        relay,
    };

    let router = app(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_address).await?;
    info!("SERVER READY: http://{}", server_config.bind_address);
    log_routes();

    axum::serve(listener, router).await?;
    Ok(())
}

fn log_routes() {
    info!("AUTH:");
    info!("   • POST /api/auth/signup");
    info!("   • POST /api/auth/login");
    info!("CHAT:");
    info!("   • GET  /api/users");
    info!("   • POST /api/chat");
    info!("   • GET  /api/chat");
    info!("   • GET  /api/chat/{{chat_id}}");
    info!("   • GET  /api/chat/{{chat_id}}/messages");
    info!("   • POST /api/chat/{{chat_id}}/messages");
    info!("RELAY:");
    info!("   • GET  /ws?token={{jwt}}");
    info!("HEALTH:");
    info!("   • GET  /health");
}
// endregion: --- Server Setup
