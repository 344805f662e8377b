use debroglie_core::callback::validate_secret_strength;
use debroglie_core::types::DbId;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Defaults suit local development; override via environment in production.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight requests to drain on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub callback: CallbackConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            callback: CallbackConfig::from_env(),
        }
    }
}

/// Settings for the computation-service callback.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// Pre-shared secret expected in the `X-Callback-Secret` header.
    pub secret: String,
    /// User recorded as reviewer when a callback completes or rejects a request.
    pub system_reviewer_id: DbId,
}

impl CallbackConfig {
    /// Load callback configuration from environment variables.
    ///
    /// | Env Var              | Required | Default |
    /// |----------------------|----------|---------|
    /// | `CALLBACK_SECRET`    | **yes**  | --      |
    /// | `SYSTEM_REVIEWER_ID` | no       | `1`     |
    ///
    /// # Panics
    ///
    /// Panics if `CALLBACK_SECRET` is missing or too short.
    pub fn from_env() -> Self {
        let secret = std::env::var("CALLBACK_SECRET")
            .expect("CALLBACK_SECRET must be set in the environment");
        if let Err(msg) = validate_secret_strength(&secret) {
            panic!("Invalid CALLBACK_SECRET: {msg}");
        }

        let system_reviewer_id: DbId = std::env::var("SYSTEM_REVIEWER_ID")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("SYSTEM_REVIEWER_ID must be a valid i64");

        Self {
            secret,
            system_reviewer_id,
        }
    }
}
