use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::{config::AppConfig, error::AppError};

/// Path prefix of the login endpoint; always public.
pub const AUTH_PATH_PREFIX: &str = "/api/auth/";

/// Path prefix of the article endpoints; public for GET only.
pub const NEWS_PATH_PREFIX: &str = "/api/news";

/// Claims
///
/// Payload of a session token. Tokens are never stored: a token is valid exactly when
/// its signature verifies against the process key and `exp` is in the future.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the admin username the token was issued to.
    pub sub: String,
    /// Issued At, seconds since the epoch.
    pub iat: usize,
    /// Expiration Time, seconds since the epoch.
    pub exp: usize,
}

/// AuthError
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// IdentityProvider
///
/// Decides whether a username/password pair identifies someone allowed to sign in.
/// The token service and the access gate depend only on this trait, so a real user
/// store can replace the static admin without touching either.
pub trait IdentityProvider: Send + Sync {
    /// Returns the token subject for a valid pair.
    fn verify(&self, username: &str, password: &str) -> Option<String>;
}

/// StaticAdmin
///
/// A single hard-configured admin account.
pub struct StaticAdmin {
    username: String,
    password: String,
}

impl StaticAdmin {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl IdentityProvider for StaticAdmin {
    fn verify(&self, username: &str, password: &str) -> Option<String> {
        // Constant-time, and both fields are always compared.
        let username_ok: bool = username.as_bytes().ct_eq(self.username.as_bytes()).into();
        let password_ok: bool = password.as_bytes().ct_eq(self.password.as_bytes()).into();
        (username_ok & password_ok).then(|| self.username.clone())
    }
}

/// TokenService
///
/// Issues and validates HS256 session tokens. The key is fixed for the lifetime of the
/// service; when it comes from [`TokenService::with_random_key`] a restart invalidates
/// every outstanding token.
pub struct TokenService {
    identity: Arc<dyn IdentityProvider>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
}

/// TokenState
///
/// The concrete type used to share the token service across the application state.
pub type TokenState = Arc<TokenService>;

impl TokenService {
    pub fn new(identity: Arc<dyn IdentityProvider>, secret: &[u8], ttl: TimeDelta) -> Self {
        Self {
            identity,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// with_random_key
    ///
    /// Generates a 256-bit key from the OS RNG. The key is never written anywhere.
    pub fn with_random_key(identity: Arc<dyn IdentityProvider>, ttl: TimeDelta) -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::new(identity, &secret, ttl)
    }

    /// from_config
    ///
    /// Wires the static admin from the configuration. Uses `JWT_SECRET` when configured,
    /// a per-process random key otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let identity = Arc::new(StaticAdmin::new(
            config.admin_username.clone(),
            config.admin_password.clone(),
        ));
        let ttl = TimeDelta::seconds(config.token_ttl_secs);

        match &config.jwt_secret {
            Some(secret) => Self::new(identity, secret.as_bytes(), ttl),
            None => {
                tracing::info!("no JWT_SECRET configured; tokens will not survive a restart");
                Self::with_random_key(identity, ttl)
            }
        }
    }

    /// authenticate
    ///
    /// Exchanges credentials for a fresh token. There is no lockout or rate limiting.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let subject = self
            .identity
            .verify(username, password)
            .ok_or(AuthError::InvalidCredentials)?;
        self.issue(&subject)
    }

    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    /// Signs a token as if it had been issued at `issued_at`; it expires one TTL later.
    pub fn issue_at(&self, subject: &str, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp().max(0) as usize,
            exp: expires_at.timestamp().max(0) as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        tracing::debug!(subject, "token issued");
        Ok(token)
    }

    /// Decodes and verifies a token: signature, algorithm and expiry with no leeway.
    pub fn claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }

    /// validate
    ///
    /// `true` when the token is well-formed, correctly signed and unexpired. Never errors.
    pub fn validate(&self, token: &str) -> bool {
        match self.claims(token) {
            Ok(claims) => {
                tracing::debug!(subject = %claims.sub, "token accepted");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                false
            }
        }
    }
}

// --- Access Gate ---

/// is_public_route
///
/// The gate's exemption rule: pre-flight requests, anything under the auth prefix, and
/// GET reads under the news prefix need no token.
pub fn is_public_route(method: &Method, path: &str) -> bool {
    *method == Method::OPTIONS
        || path.starts_with(AUTH_PATH_PREFIX)
        || (*method == Method::GET && path.starts_with(NEWS_PATH_PREFIX))
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// access_gate
///
/// Middleware in front of every `/api` route. Public routes pass straight through; every
/// other request needs a bearer token the token service accepts, otherwise it is answered
/// with 401 and never reaches its handler.
pub async fn access_gate(
    State(tokens): State<TokenState>,
    request: Request,
    next: Next,
) -> Response {
    if is_public_route(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let verdict = bearer_token(request.headers()).map(|token| tokens.validate(token));
    match verdict {
        Some(true) => next.run(request).await,
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "rejected invalid bearer token");
            AppError::Unauthorized.into_response()
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "missing bearer token");
            AppError::Unauthorized.into_response()
        }
    }
}
