use std::{env, path::PathBuf};

use thiserror::Error;

/// Default token lifetime: four hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 4 * 60 * 60;

/// Default ceiling for a single upload request body (10 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled
/// into handlers and middleware via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls logging format and which secrets are mandatory.
    pub env: Env,
    // Address the HTTP server binds to.
    pub host: String,
    pub port: u16,
    // Postgres connection string. `None` selects the in-memory article store (local only).
    pub db_url: Option<String>,
    // Directory uploaded images are written to and served from.
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    // The single admin identity allowed to sign in.
    pub admin_username: String,
    pub admin_password: String,
    // Optional persistent signing secret. When absent a random key is generated per process.
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: i64,
    // Origins allowed to call the API from a browser.
    pub cors_allowed_origins: Vec<String>,
}

/// Env
///
/// Defines the runtime context: local development (pretty logs, in-memory fallback,
/// default admin password) or production (JSON logs, every secret explicit).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ConfigError
///
/// Raised by [`AppConfig::from_lookup`] when a variable is missing in production or
/// cannot be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe AppConfig instance for tests: local mode, in-memory store, a fixed
    /// JWT secret and the stock admin credentials.
    fn default() -> Self {
        Self {
            env: Env::Local,
            host: "127.0.0.1".to_string(),
            port: 8080,
            db_url: None,
            upload_dir: PathBuf::from("uploads"),
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            jwt_secret: Some("newsdesk-test-secret".to_string()),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. Call `dotenv` first if a
    /// `.env` file should be honoured.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// from_lookup
    ///
    /// Builds the configuration from an arbitrary variable source. Production refuses to
    /// start without `DATABASE_URL` and `ADMIN_PASSWORD`; local mode falls back to the
    /// in-memory store and the stock admin password.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let env = match var("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = var("DATABASE_URL");
        let admin_password = var("ADMIN_PASSWORD");

        let (db_url, admin_password) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                admin_password.ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?,
            ),
            Env::Local => (
                db_url,
                admin_password.unwrap_or_else(|| "admin123".to_string()),
            ),
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            env,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("APP_PORT", var("APP_PORT"), 8080)?,
            db_url,
            upload_dir: PathBuf::from(var("UPLOAD_PATH").unwrap_or_else(|| "uploads".to_string())),
            upload_max_bytes: parse_or(
                "UPLOAD_MAX_BYTES",
                var("UPLOAD_MAX_BYTES"),
                DEFAULT_UPLOAD_MAX_BYTES,
            )?,
            admin_username: var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password,
            jwt_secret: var("JWT_SECRET"),
            token_ttl_secs: parse_or(
                "TOKEN_TTL_SECONDS",
                var("TOKEN_TTL_SECONDS"),
                DEFAULT_TOKEN_TTL_SECS,
            )?,
            cors_allowed_origins,
        })
    }

    /// The `host:port` pair the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
