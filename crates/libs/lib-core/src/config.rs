//! # Application Configuration
//!
//! Configuration loaded from environment variables and validated on startup
//! to fail fast if misconfigured.
//!
//! Use [`core_config()`] to access the global instance after a single
//! [`init_config()`] call at startup; handlers that already carry a `Config`
//! clone in state should prefer that.

use std::env;
use std::sync::OnceLock;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database connection URL
    pub database_url: String,

    /// Secret key for JWT token signing and verification
    ///
    /// **Must be at least 32 characters long**.
    pub jwt_secret: String,

    /// JWT token validity period in hours (1-720)
    pub jwt_expiration_hours: i64,

    /// Allowed cross-origin address for browser clients
    pub frontend_origin: String,

    /// Delay between simulated assistant reply chunks, in milliseconds
    pub ai_chunk_millis: u64,

    /// Client-side expiry for an assistant stream that never completes,
    /// in seconds
    pub ai_stream_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:data/chat.db".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set in environment")?;

        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|e| format!("JWT_EXPIRATION_HOURS must be a valid number: {}", e))?;

        let frontend_origin = env::var("FRONTEND_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let ai_chunk_millis = env::var("AI_STREAM_CHUNK_MILLIS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .map_err(|e| format!("AI_STREAM_CHUNK_MILLIS must be a valid number: {}", e))?;

        let ai_stream_timeout_secs = env::var("AI_STREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| format!("AI_STREAM_TIMEOUT_SECS must be a valid number: {}", e))?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration_hours,
            frontend_origin,
            ai_chunk_millis,
            ai_stream_timeout_secs,
        })
    }

    /// Validate configuration values against security and business rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".to_string());
        }

        if self.jwt_expiration_hours < 1 || self.jwt_expiration_hours > 720 {
            return Err("JWT_EXPIRATION_HOURS must be between 1 and 720 (30 days)".to_string());
        }

        if self.ai_stream_timeout_secs == 0 {
            return Err("AI_STREAM_TIMEOUT_SECS must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Global configuration instance (initialized once at startup).
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize the global configuration.
///
/// Call once at application startup, before any handler or middleware that
/// needs configuration runs.
pub fn init_config() -> Result<(), String> {
    let config = Config::from_env()?;
    config.validate()?;

    CONFIG
        .set(config)
        .map_err(|_| "Config has already been initialized".to_string())
}

/// Get a reference to the global configuration.
///
/// # Panics
///
/// Panics if [`init_config()`] has not been called yet.
pub fn core_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Config not initialized - call init_config() at startup")
}
